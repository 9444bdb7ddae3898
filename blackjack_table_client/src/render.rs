use blackjack_table_core::{ClientMessage, Command, Participant, RoundPhase, ServerMessage, TableSnapshot, Warning};

/// 把一行输入解析成要发给服务器的消息
pub fn parse_command(line: &str) -> Result<ClientMessage, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let amount = |usage: &str| -> Result<i64, String> {
        parts
            .get(1)
            .ok_or_else(|| format!("用法: {}", usage))?
            .parse::<u32>()
            .map(i64::from)
            .map_err(|_| format!("无效的金额: {}", parts[1]))
    };

    let command = match parts.first().copied() {
        Some("bet") => Command::AdjustBet(amount("bet <金额>")?),
        Some("unbet") => Command::AdjustBet(-amount("unbet <金额>")?),
        Some("clear") => Command::ClearBet,
        Some("deal") => Command::StartRound,
        Some("hit") => Command::Hit,
        Some("stand") => Command::Stand,
        Some("reset") => Command::AcknowledgeReset,
        Some("show") => return Ok(ClientMessage::GetSnapshot),
        _ => return Err(format!("未知命令: {}", line.trim())),
    };
    Ok(command.into())
}

/// 收到服务器消息后需要自动回复的消息: 没有动画，牌一到就确认落定
pub fn auto_reply(msg: &ServerMessage) -> Option<ClientMessage> {
    matches!(msg, ServerMessage::CardDealt { .. }).then(|| Command::CardSettled.into())
}

fn participant_name(participant: Participant) -> &'static str {
    match participant {
        Participant::Player => "玩家",
        Participant::Dealer => "庄家",
    }
}

fn phase_name(phase: RoundPhase) -> &'static str {
    match phase {
        RoundPhase::Idle => "等待下注",
        RoundPhase::Dealing => "发牌中",
        RoundPhase::PlayerTurn => "玩家回合 (hit / stand)",
        RoundPhase::DealerTurn => "庄家回合",
        RoundPhase::Settled => "已结算 (reset 立即清桌)",
    }
}

pub fn warning_text(warning: Warning) -> &'static str {
    match warning {
        Warning::ZeroBet => "请先下注",
        Warning::MaxBet => "已达到单局下注上限",
        Warning::InsufficientFunds => "余额不足",
    }
}

fn render_snapshot(snapshot: &TableSnapshot) -> String {
    let dealer: Vec<String> = snapshot
        .dealer_cards
        .iter()
        .map(|card| card.as_ref().map_or_else(|| "🂠".to_string(), |c| c.name.clone()))
        .collect();
    let player: Vec<&str> = snapshot.player_cards.iter().map(|c| c.name.as_str()).collect();
    format!(
        "[{}] 余额 {} | 下注 {} / {}\n  庄家: {} ({})\n  玩家: {} ({})",
        phase_name(snapshot.phase),
        snapshot.balance,
        snapshot.bet,
        snapshot.max_bet,
        dealer.join(" "),
        snapshot.dealer_score,
        player.join(" "),
        snapshot.player_score,
    )
}

/// 把服务器消息渲染成一段文本
pub fn render(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::TableOpened { table_id, snapshot } => {
            format!("牌桌 {} 已开启\n{}", table_id, render_snapshot(snapshot))
        }
        ServerMessage::Snapshot(snapshot) => render_snapshot(snapshot),
        ServerMessage::PhaseChanged { phase } => format!("--- {} ---", phase_name(*phase)),
        ServerMessage::CardDealt { participant, card, .. } => match card {
            Some(card) => format!("{} 拿到 {}", participant_name(*participant), card.name),
            None => format!("{} 拿到一张暗牌", participant_name(*participant)),
        },
        ServerMessage::HoleCardRevealed { card, .. } => format!("庄家翻开底牌 {}", card.name),
        ServerMessage::ScoreChanged { participant, display } => {
            format!("{} 点数: {}", participant_name(*participant), display)
        }
        ServerMessage::RoundResult { message, .. } => format!("*** {} ***", message),
        ServerMessage::BalanceChanged { balance } => format!("余额: {}", balance),
        ServerMessage::BetChanged { bet, clamp } => match clamp.warning() {
            Some(warning) => format!("下注: {} ({})", bet, warning_text(warning)),
            None => format!("下注: {}", bet),
        },
        ServerMessage::TableCleared => "牌桌已清空".to_string(),
        ServerMessage::Warning { warning, .. } => format!("提示: {}", warning_text(*warning)),
        ServerMessage::Error { message } => format!("错误: {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackjack_table_core::{BetClamp, Card, display_score, hole_display, score};

    #[test]
    fn test_parse_commands() {
        assert!(matches!(parse_command("bet 100"), Ok(ClientMessage::Perform(Command::AdjustBet(100)))));
        assert!(matches!(parse_command("  unbet 50 "), Ok(ClientMessage::Perform(Command::AdjustBet(-50)))));
        assert!(matches!(parse_command("deal"), Ok(ClientMessage::Perform(Command::StartRound))));
        assert!(matches!(parse_command("reset"), Ok(ClientMessage::Perform(Command::AcknowledgeReset))));
        assert!(matches!(parse_command("show"), Ok(ClientMessage::GetSnapshot)));

        assert_eq!(parse_command("bet").unwrap_err(), "用法: bet <金额>");
        assert_eq!(parse_command("bet -5").unwrap_err(), "无效的金额: -5");
        assert_eq!(parse_command("fold").unwrap_err(), "未知命令: fold");
    }

    #[test]
    fn test_auto_reply_only_for_dealt_cards() {
        let dealt = ServerMessage::CardDealt {
            participant: Participant::Player,
            card: Some(Card::new("♠️10", 10)),
            face_up: true,
            position: 0,
            order: 0,
        };
        assert!(matches!(auto_reply(&dealt), Some(ClientMessage::Perform(Command::CardSettled))));
        assert!(auto_reply(&ServerMessage::TableCleared).is_none());
        assert!(auto_reply(&ServerMessage::PhaseChanged { phase: RoundPhase::Dealing }).is_none());
    }

    #[test]
    fn test_render_hole_card_and_clamp() {
        let hidden = ServerMessage::CardDealt {
            participant: Participant::Dealer,
            card: None,
            face_up: false,
            position: 1,
            order: 3,
        };
        assert_eq!(render(&hidden), "庄家 拿到一张暗牌");

        let clamped = ServerMessage::BetChanged { bet: 1000, clamp: BetClamp::MaxBet };
        assert_eq!(render(&clamped), "下注: 1000 (已达到单局下注上限)");
    }

    #[test]
    fn test_render_snapshot_masks_hole() {
        let snapshot = TableSnapshot {
            phase: RoundPhase::PlayerTurn,
            balance: 9_900,
            bet: 100,
            max_bet: 1_000,
            player_cards: vec![Card::new("♠️10", 10), Card::new("♥️9", 9)],
            dealer_cards: vec![Some(Card::new("♣️A", 11)), None],
            player_score: "19".to_string(),
            dealer_score: "1/11".to_string(),
        };
        let text = render_snapshot(&snapshot);
        assert!(text.contains("庄家: ♣️A 🂠 (1/11)"));
        assert!(text.contains("玩家: ♠️10 ♥️9 (19)"));
    }

    #[test]
    fn test_scores_from_core_evaluator() {
        let cards = [Card::new("♣️A", 11), Card::new("♦️A", 11)];
        let points: Vec<u8> = cards.iter().map(|c| c.point).collect();
        assert_eq!(score(&points), 12);
        assert_eq!(display_score(&points), "2/12");
        assert_eq!(hole_display(&points), "1/11");
    }
}
