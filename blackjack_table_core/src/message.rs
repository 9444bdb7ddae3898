use crate::card::Card;
use crate::error::{BetClamp, Warning};
use crate::ledger::Outcome;
use crate::round::{Participant, RoundPhase, Verdict};
use crate::table::{TableId, TableSnapshot};
use serde::{Deserialize, Serialize};

// --- 引擎 -> 界面 的事件 ---

/// 牌桌引擎发出的事件，界面据此渲染
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum TableEvent {
    PhaseChanged { phase: RoundPhase },
    /// 发出一张牌。`position` 是它在该方手牌中的位置，`order` 是本局的发牌顺序
    CardDealt {
        participant: Participant,
        card: Card,
        face_up: bool,
        position: usize,
        order: u32,
    },
    /// 庄家回合开始时翻开底牌
    HoleCardRevealed { card: Card, position: usize },
    /// 分数文本变化 (底牌未翻开时庄家只显示明牌)
    ScoreChanged { participant: Participant, display: String },
    RoundResult {
        outcome: Outcome,
        verdict: Verdict,
        message: String,
    },
    BalanceChanged { balance: u32 },
    BetChanged { bet: u32, clamp: BetClamp },
    /// 界面应清除所有已发出的牌
    TableCleared,
    Error { message: String },
}

// --- 界面 -> 引擎 的指令 ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 正数加注，负数减注
    AdjustBet(i64),
    ClearBet,
    StartRound,
    Hit,
    Stand,
    /// 结算后确认，立即清桌
    AcknowledgeReset,
    /// 最近发出的那张牌动画已结束
    CardSettled,
}

// --- 客户端 -> 服务器 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ClientMessage {
    /// 对自己的牌桌执行一条指令
    Perform(Command),
    /// 请求当前牌桌快照
    GetSnapshot,
}

impl From<Command> for ClientMessage {
    fn from(command: Command) -> Self {
        ClientMessage::Perform(command)
    }
}

// --- 服务器 -> 客户端 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ServerMessage {
    /// 连接建立后，服务器为该连接开好一张牌桌
    TableOpened { table_id: TableId, snapshot: TableSnapshot },
    Snapshot(TableSnapshot),

    PhaseChanged { phase: RoundPhase },
    /// 暗牌不会发给客户端，`card` 为 `None`
    CardDealt {
        participant: Participant,
        card: Option<Card>,
        face_up: bool,
        position: usize,
        order: u32,
    },
    HoleCardRevealed { card: Card, position: usize },
    ScoreChanged { participant: Participant, display: String },
    RoundResult {
        outcome: Outcome,
        verdict: Verdict,
        message: String,
    },
    BalanceChanged { balance: u32 },
    BetChanged { bet: u32, clamp: BetClamp },
    TableCleared,

    /// 可恢复的提示 (没下注就开局等)
    Warning { warning: Warning, message: String },
    Error { message: String },
}

impl From<TableEvent> for ServerMessage {
    fn from(event: TableEvent) -> Self {
        match event {
            TableEvent::PhaseChanged { phase } => ServerMessage::PhaseChanged { phase },
            TableEvent::CardDealt { participant, card, face_up, position, order } => ServerMessage::CardDealt {
                participant,
                card: face_up.then_some(card),
                face_up,
                position,
                order,
            },
            TableEvent::HoleCardRevealed { card, position } => ServerMessage::HoleCardRevealed { card, position },
            TableEvent::ScoreChanged { participant, display } => ServerMessage::ScoreChanged { participant, display },
            TableEvent::RoundResult { outcome, verdict, message } => ServerMessage::RoundResult { outcome, verdict, message },
            TableEvent::BalanceChanged { balance } => ServerMessage::BalanceChanged { balance },
            TableEvent::BetChanged { bet, clamp } => ServerMessage::BetChanged { bet, clamp },
            TableEvent::TableCleared => ServerMessage::TableCleared,
            TableEvent::Error { message } => ServerMessage::Error { message },
        }
    }
}
