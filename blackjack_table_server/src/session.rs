use blackjack_table_core::{ClientMessage, Command, ServerMessage, Suspend, Table, TableError, TableEvent, Warning};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// 发送失败，说明写任务已退出 (客户端断开)
type Closed = mpsc::error::SendError<ServerMessage>;

/// 一个连接独占的一张牌桌，以及驱动它的协作式调度循环
///
/// 每次 `advance` 之后按 `Suspend` 等待：牌落定 (带超时)、固定停顿、
/// 或玩家指令。等待期间到达的指令都会立刻交给牌桌处理。
pub struct Session {
    table: Table,
    inbound: mpsc::Receiver<ClientMessage>,
    outbound: mpsc::Sender<ServerMessage>,
}

impl Session {
    pub fn new(table: Table, inbound: mpsc::Receiver<ClientMessage>, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self { table, inbound, outbound }
    }

    pub async fn run(mut self) {
        let table_id = self.table.id();
        info!("牌桌 {} 已开启", table_id);
        match self.drive().await {
            Ok(()) => info!("牌桌 {} 的客户端已离开", table_id),
            Err(_) => warn!("牌桌 {} 的消息发不出去，会话结束", table_id),
        }
    }

    async fn drive(&mut self) -> Result<(), Closed> {
        let opened = ServerMessage::TableOpened {
            table_id: self.table.id(),
            snapshot: self.table.snapshot(),
        };
        self.outbound.send(opened).await?;

        loop {
            let tick = self.table.advance();
            self.forward(tick.events).await?;

            let connected = match tick.next {
                Suspend::AwaitInput => match self.inbound.recv().await {
                    Some(msg) => {
                        self.on_message(msg).await?;
                        true
                    }
                    None => false,
                },
                Suspend::CardSettle => {
                    let deadline = Instant::now() + self.table.timings().settle_timeout();
                    self.wait_settle(deadline).await?
                }
                Suspend::Pause(pause) => {
                    let deadline = Instant::now() + self.table.timings().pause(pause);
                    self.wait_pause(deadline).await?
                }
            };
            if !connected {
                return Ok(());
            }
        }
    }

    /// 等客户端报告牌已落定，超时就替它发出落定信号
    ///
    /// 返回 `false` 表示客户端已经断开。
    async fn wait_settle(&mut self, deadline: Instant) -> Result<bool, Closed> {
        let timeout = sleep_until(deadline);
        tokio::pin!(timeout);

        while self.table.round().card_in_flight() {
            tokio::select! {
                _ = &mut timeout => {
                    debug!("牌桌 {} 等待落定超时", self.table.id());
                    self.perform(Command::CardSettled).await?;
                }
                msg = self.inbound.recv() => match msg {
                    Some(msg) => self.on_message(msg).await?,
                    None => return Ok(false),
                },
            }
        }
        Ok(true)
    }

    /// 固定停顿，计时不会被取消，期间照常处理指令
    async fn wait_pause(&mut self, deadline: Instant) -> Result<bool, Closed> {
        let timer = sleep_until(deadline);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = &mut timer => return Ok(true),
                msg = self.inbound.recv() => match msg {
                    Some(msg) => self.on_message(msg).await?,
                    None => return Ok(false),
                },
            }
        }
    }

    async fn on_message(&mut self, msg: ClientMessage) -> Result<(), Closed> {
        match msg {
            ClientMessage::Perform(command) => self.perform(command).await,
            ClientMessage::GetSnapshot => self.outbound.send(ServerMessage::Snapshot(self.table.snapshot())).await,
        }
    }

    async fn perform(&mut self, command: Command) -> Result<(), Closed> {
        match self.table.handle(command) {
            Ok(events) => self.forward(events).await,
            Err(TableError::ZeroBet) => {
                let warning = ServerMessage::Warning {
                    warning: Warning::ZeroBet,
                    message: TableError::ZeroBet.to_string(),
                };
                self.outbound.send(warning).await
            }
            Err(e @ TableError::InvalidStateTransition { .. }) => {
                // 界面上的误触很常见，只记日志
                debug!("牌桌 {} 忽略指令 {:?}: {}", self.table.id(), command, e);
                Ok(())
            }
            Err(e) => {
                warn!("牌桌 {} 处理指令 {:?} 失败: {}", self.table.id(), command, e);
                self.outbound.send(ServerMessage::Error { message: e.to_string() }).await
            }
        }
    }

    async fn forward(&self, events: Vec<TableEvent>) -> Result<(), Closed> {
        for event in events {
            self.outbound.send(event.into()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackjack_table_core::{Card, Deck, Outcome, Participant, RoundPhase, TableConfig};
    use std::time::Duration;
    use tokio::task::JoinHandle;

    fn stacked_table(points: &[u8]) -> Table {
        let cards = points.iter().map(|&p| Card::new(p.to_string(), p)).collect();
        Table::with_deck(&TableConfig::default(), Deck::stacked(cards))
    }

    fn open(table: Table) -> (mpsc::Sender<ClientMessage>, mpsc::Receiver<ServerMessage>, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (tx, rx) = mpsc::channel(32);
        let handle = tokio::spawn(Session::new(table, cmd_rx, tx).run());
        (cmd_tx, rx, handle)
    }

    /// 收集消息，直到 (并包括) 第一条满足条件的消息
    async fn collect_until(
        rx: &mut mpsc::Receiver<ServerMessage>,
        stop: impl Fn(&ServerMessage) -> bool,
    ) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Some(msg) = rx.recv().await {
            let done = stop(&msg);
            messages.push(msg);
            if done {
                return messages;
            }
        }
        panic!("会话提前结束，已收到 {:?}", messages);
    }

    fn is_player_turn(msg: &ServerMessage) -> bool {
        matches!(msg, ServerMessage::PhaseChanged { phase: RoundPhase::PlayerTurn })
    }

    async fn bet_and_start(cmd: &mpsc::Sender<ClientMessage>, bet: i64) {
        cmd.send(Command::AdjustBet(bet).into()).await.unwrap();
        cmd.send(Command::StartRound.into()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_table_opened_on_connect() {
        let table = stacked_table(&[10, 10, 9, 7]);
        let id = table.id();
        let (_cmd, mut rx, _) = open(table);

        match rx.recv().await {
            Some(ServerMessage::TableOpened { table_id, snapshot }) => {
                assert_eq!(table_id, id);
                assert_eq!(snapshot.phase, RoundPhase::Idle);
                assert_eq!(snapshot.balance, 10_000);
                assert_eq!(snapshot.max_bet, 1_000);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_timeout_drives_deal() {
        let (cmd, mut rx, _) = open(stacked_table(&[10, 10, 9, 7]));
        bet_and_start(&cmd, 100).await;
        let begin = Instant::now();

        let messages = collect_until(&mut rx, is_player_turn).await;
        // 客户端从不确认，每张牌都要等满超时
        assert!(begin.elapsed() >= Duration::from_millis(4 * 1500));

        let dealt: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::CardDealt { participant, card, .. } => Some((*participant, card.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(dealt.len(), 4);
        assert_eq!(dealt[3], (Participant::Dealer, None));
        assert!(dealt[..3].iter().all(|(_, card)| card.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_settle_skips_timeout() {
        let (cmd, mut rx, _) = open(stacked_table(&[10, 10, 9, 7]));
        bet_and_start(&cmd, 100).await;
        let begin = Instant::now();

        loop {
            match rx.recv().await.unwrap() {
                ServerMessage::CardDealt { .. } => cmd.send(Command::CardSettled.into()).await.unwrap(),
                msg if is_player_turn(&msg) => break,
                _ => {}
            }
        }
        // 只剩每张牌之后的节奏停顿
        assert!(begin.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_round_clears_table() {
        let (cmd, mut rx, _) = open(stacked_table(&[10, 10, 9, 7]));
        bet_and_start(&cmd, 100).await;
        collect_until(&mut rx, is_player_turn).await;

        cmd.send(Command::Stand.into()).await.unwrap();
        let messages = collect_until(&mut rx, |m| matches!(m, ServerMessage::TableCleared)).await;
        assert!(messages.iter().any(|m| matches!(m, ServerMessage::HoleCardRevealed { position: 1, .. })));
        assert!(messages.iter().any(|m| matches!(m, ServerMessage::RoundResult { outcome: Outcome::Win, .. })));
        assert!(messages.iter().any(|m| matches!(m, ServerMessage::BalanceChanged { balance: 10_100 })));

        cmd.send(ClientMessage::GetSnapshot).await.unwrap();
        let messages = collect_until(&mut rx, |m| matches!(m, ServerMessage::Snapshot(_))).await;
        match messages.last() {
            Some(ServerMessage::Snapshot(snapshot)) => {
                assert_eq!(snapshot.phase, RoundPhase::Idle);
                assert_eq!(snapshot.balance, 10_100);
                assert_eq!(snapshot.bet, 0);
                assert!(snapshot.player_cards.is_empty());
                assert!(snapshot.dealer_cards.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_reset_during_result_display() {
        let (cmd, mut rx, _) = open(stacked_table(&[10, 10, 10, 10]));
        bet_and_start(&cmd, 250).await;
        collect_until(&mut rx, is_player_turn).await;
        cmd.send(Command::Stand.into()).await.unwrap();

        collect_until(&mut rx, |m| matches!(m, ServerMessage::RoundResult { outcome: Outcome::Push, .. })).await;
        let shown = Instant::now();
        cmd.send(Command::AcknowledgeReset.into()).await.unwrap();
        collect_until(&mut rx, |m| matches!(m, ServerMessage::TableCleared)).await;
        assert!(shown.elapsed() < Duration::from_millis(2500));

        // 剩下的展示计时结束后不会再清一次桌，新一局照常开始
        bet_and_start(&cmd, 100).await;
        let messages = collect_until(&mut rx, is_player_turn).await;
        assert!(!messages.iter().any(|m| matches!(m, ServerMessage::TableCleared)));
        assert!(messages.iter().any(|m| matches!(m, ServerMessage::BalanceChanged { balance: 9_900 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_bet_is_a_warning() {
        let (cmd, mut rx, _) = open(stacked_table(&[10, 10, 9, 7]));
        cmd.send(Command::StartRound.into()).await.unwrap();

        let messages = collect_until(&mut rx, |m| matches!(m, ServerMessage::Warning { .. })).await;
        match messages.last() {
            Some(ServerMessage::Warning { warning, message }) => {
                assert_eq!(*warning, Warning::ZeroBet);
                assert_eq!(message, "请先下注再开始游戏");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!messages.iter().any(|m| matches!(m, ServerMessage::PhaseChanged { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_while_dealing_is_ignored() {
        let (cmd, mut rx, _) = open(stacked_table(&[10, 10, 9, 7, 2]));
        bet_and_start(&cmd, 100).await;
        cmd.send(Command::Hit.into()).await.unwrap();

        let messages = collect_until(&mut rx, is_player_turn).await;
        let player_cards = messages
            .iter()
            .filter(|m| matches!(m, ServerMessage::CardDealt { participant: Participant::Player, .. }))
            .count();
        assert_eq!(player_cards, 2);
        assert!(!messages.iter().any(|m| matches!(m, ServerMessage::Error { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_ends_session() {
        let (cmd, mut rx, handle) = open(stacked_table(&[10, 10, 9, 7]));
        bet_and_start(&cmd, 100).await;
        collect_until(&mut rx, |m| matches!(m, ServerMessage::CardDealt { .. })).await;

        // 发牌途中断开，正在等待的计时不会让会话继续
        drop(cmd);
        handle.await.unwrap();
    }
}
