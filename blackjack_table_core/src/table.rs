use crate::card::{Card, Deck, standard_cards};
use crate::error::TableError;
use crate::ledger::{BettingLedger, DEFAULT_BALANCE, DEFAULT_MAX_BET};
use crate::message::{Command, TableEvent};
use crate::round::{Participant, Pause, RoundController, RoundPhase, Tick, HOLE_POSITION};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

pub type TableId = Uuid;

// --- 配置 ---

/// 各类停顿的时长 (毫秒)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// 界面迟迟不报告牌落定时，最多等这么久
    pub settle_timeout_ms: u64,
    pub deal_pacing_ms: u64,
    pub reveal_pause_ms: u64,
    pub verdict_pause_ms: u64,
    pub result_display_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_timeout_ms: 1500,
            deal_pacing_ms: 200,
            reveal_pause_ms: 1000,
            verdict_pause_ms: 500,
            result_display_ms: 2500,
        }
    }
}

impl Timings {
    pub fn pause(&self, pause: Pause) -> Duration {
        Duration::from_millis(match pause {
            Pause::DealPacing => self.deal_pacing_ms,
            Pause::Reveal => self.reveal_pause_ms,
            Pause::Verdict => self.verdict_pause_ms,
            Pause::ResultDisplay => self.result_display_ms,
        })
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

/// 牌桌配置，可以从 JSON 文件读取，缺省字段取默认值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub starting_balance: u32,
    pub max_bet: u32,
    /// 固定洗牌种子，方便复现
    pub seed: Option<u64>,
    /// 自定义牌组，缺省为标准 52 张
    pub cards: Option<Vec<Card>>,
    pub timings: Timings,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_BALANCE,
            max_bet: DEFAULT_MAX_BET,
            seed: None,
            cards: None,
            timings: Timings::default(),
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), TableError> {
        if self.max_bet == 0 {
            return Err(TableError::InvalidConfig("max_bet 必须大于 0".to_string()));
        }
        if self.cards.as_ref().is_some_and(|cards| cards.is_empty()) {
            return Err(TableError::InvalidConfig("牌组不能为空".to_string()));
        }
        Ok(())
    }

    /// 按配置建出牌堆
    pub fn build_deck(&self) -> Deck {
        let cards = self.cards.clone().unwrap_or_else(standard_cards);
        match self.seed {
            Some(seed) => Deck::seeded(cards, seed),
            None => Deck::new(cards),
        }
    }
}

// --- 快照 ---

/// 牌桌的只读快照，庄家底牌未翻开时为 `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub phase: RoundPhase,
    pub balance: u32,
    pub bet: u32,
    pub max_bet: u32,
    pub player_cards: Vec<Card>,
    pub dealer_cards: Vec<Option<Card>>,
    pub player_score: String,
    pub dealer_score: String,
}

// --- 牌桌 ---

/// 一张牌桌: 一个下注账本加一个牌局控制器
///
/// 由宿主进程显式创建并持有，界面只能通过 `handle` 发指令、
/// 通过事件和快照读取状态。
#[derive(Debug, Clone)]
pub struct Table {
    id: TableId,
    ledger: BettingLedger,
    round: RoundController,
    timings: Timings,
}

impl Table {
    pub fn new(config: &TableConfig) -> Result<Self, TableError> {
        config.validate()?;
        Ok(Self::with_deck(config, config.build_deck()))
    }

    /// 使用指定的牌堆 (例如固定顺序的牌堆)
    pub fn with_deck(config: &TableConfig, deck: Deck) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger: BettingLedger::new(config.starting_balance, config.max_bet),
            round: RoundController::new(deck),
            timings: config.timings.clone(),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    pub fn ledger(&self) -> &BettingLedger {
        &self.ledger
    }

    pub fn round(&self) -> &RoundController {
        &self.round
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// 处理一条指令
    ///
    /// 不合时宜的指令返回 `InvalidStateTransition`，不会改变任何状态。
    pub fn handle(&mut self, command: Command) -> Result<Vec<TableEvent>, TableError> {
        debug!("牌桌 {} 收到指令 {:?}", self.id, command);
        match command {
            Command::AdjustBet(delta) => {
                self.round.ensure("adjust_bet", RoundPhase::Idle)?;
                let change = self.ledger.adjust_bet(delta);
                Ok(vec![TableEvent::BetChanged { bet: change.bet, clamp: change.clamp }])
            }
            Command::ClearBet => {
                self.round.ensure("clear_bet", RoundPhase::Idle)?;
                let change = self.ledger.clear_bet();
                Ok(vec![TableEvent::BetChanged { bet: change.bet, clamp: change.clamp }])
            }
            Command::StartRound => {
                // 先确认阶段，避免扣了钱却开不了局
                self.round.ensure("start_round", RoundPhase::Idle)?;
                self.ledger.commit_bet()?;
                let mut events = vec![TableEvent::BalanceChanged { balance: self.ledger.balance() }];
                events.extend(self.round.start_round()?);
                Ok(events)
            }
            Command::Hit => {
                self.round.hit()?;
                Ok(Vec::new())
            }
            Command::Stand => self.round.stand(),
            Command::AcknowledgeReset => self.round.acknowledge_reset(&mut self.ledger),
            Command::CardSettled => {
                if !self.round.card_settled() {
                    debug!("牌桌 {} 忽略多余的落定信号", self.id);
                }
                Ok(Vec::new())
            }
        }
    }

    /// 推进牌局直到下一个暂停点
    pub fn advance(&mut self) -> Tick {
        self.round.advance(&mut self.ledger)
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let hole_hidden = !self.round.hole_revealed();
        let dealer_cards = self
            .round
            .dealer()
            .cards()
            .iter()
            .enumerate()
            .map(|(i, card)| (!(hole_hidden && i == HOLE_POSITION)).then(|| card.clone()))
            .collect();

        TableSnapshot {
            phase: self.round.phase(),
            balance: self.ledger.balance(),
            bet: self.ledger.current_bet(),
            max_bet: self.ledger.max_bet(),
            player_cards: self.round.player().cards().to_vec(),
            dealer_cards,
            player_score: self.round.score_display(Participant::Player),
            dealer_score: self.round.score_display(Participant::Dealer),
        }
    }
}

// --- 单元测试 ---
