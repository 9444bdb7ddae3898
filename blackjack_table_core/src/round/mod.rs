//! 一局 21 点的状态机
//!
//! 发牌、玩家回合、庄家回合和结算都被拆成一个个离散的步骤 (`Step`)，
//! 放在队列里依次执行。`advance` 会一直执行到某个需要暂停的步骤为止，
//! 把期间产生的事件连同暂停原因 (`Suspend`) 一起交给驱动方；
//! 驱动方等到牌落定、或计时结束后再次调用 `advance`。
//! 任何时刻最多只有一个步骤在进行中。

use crate::card::{Card, Deck};
use crate::error::{BetClamp, TableError};
use crate::hand::{self, Hand};
use crate::ledger::{BettingLedger, Outcome};
use crate::message::TableEvent;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, error, info};

/// 庄家拿到 17 点及以上停牌
pub const DEALER_STANDS_ON: u32 = 17;
/// 庄家底牌在手牌中的位置
pub const HOLE_POSITION: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Participant {
    Player,
    Dealer,
}

/// 当前阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    Idle,
    Dealing,
    PlayerTurn,
    DealerTurn,
    Settled, // 已结算，等待清桌
}

/// 固定时长的停顿
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pause {
    /// 每张牌发完后的节奏停顿
    DealPacing,
    /// 翻开底牌后、庄家开始要牌前
    Reveal,
    /// 宣布提前结束 (爆牌、五龙) 之前
    Verdict,
    /// 结果展示，结束后自动清桌
    ResultDisplay,
}

/// `advance` 返回后驱动方应该等待什么
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspend {
    /// 等界面报告牌已落定 (或用固定超时代替)
    CardSettle,
    Pause(Pause),
    /// 队列已空，等待玩家指令
    AwaitInput,
}

/// 一次 `advance` 的产出
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub events: Vec<TableEvent>,
    pub next: Suspend,
}

/// 本局结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    PlayerBust,
    DealerBust,
    PlayerHigher,
    DealerHigher,
    Tie,
    /// 玩家五张不爆，直接获胜
    FiveCardCharlie,
    /// 庄家五张不爆，玩家直接输 (与玩家的五龙规则不对称)
    DealerFiveCards,
    DeckExhausted,
}

impl Verdict {
    pub fn outcome(self) -> Outcome {
        match self {
            Verdict::DealerBust | Verdict::PlayerHigher | Verdict::FiveCardCharlie => Outcome::Win,
            Verdict::PlayerBust | Verdict::DealerHigher | Verdict::DealerFiveCards => Outcome::Loss,
            Verdict::Tie => Outcome::Push,
            Verdict::DeckExhausted => Outcome::Void,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::PlayerBust => "爆牌! 超过了 21 点",
            Verdict::DealerBust => "庄家爆牌! 你赢了!",
            Verdict::PlayerHigher => "恭喜! 你赢了!",
            Verdict::DealerHigher => "庄家赢了。",
            Verdict::Tie => "平局",
            Verdict::FiveCardCharlie => "五龙! 你赢了!",
            Verdict::DealerFiveCards => "庄家五张不爆! 你输了。",
            Verdict::DeckExhausted => "牌堆已发完，本局作废，退还本金",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Deal { to: Participant, face_up: bool },
    /// 牌落定之后: 通知分数，玩家的牌还要检查爆牌/五龙
    Settled { to: Participant },
    Pace(Pause),
    BeginPlayerTurn,
    RevealHole,
    /// 庄家决定是否继续要牌
    DealerDecide,
    /// 庄家每要一张牌之后的检查
    DealerAfterDraw,
    /// `None` 表示正常比较双方分数
    Conclude(Option<Verdict>),
    ClearTable,
}

/// 牌局控制器，独占牌堆和双方手牌
#[derive(Debug, Clone)]
pub struct RoundController {
    deck: Deck,
    player: Hand,
    dealer: Hand,
    hole_revealed: bool,
    phase: RoundPhase,
    steps: VecDeque<Step>,
    card_in_flight: bool,
    // 本局发牌的先后顺序，供界面决定叠放层级
    deal_order: u32,
    last_verdict: Option<Verdict>,
}

impl RoundController {
    pub fn new(deck: Deck) -> Self {
        Self {
            deck,
            player: Hand::new(),
            dealer: Hand::new(),
            hole_revealed: false,
            phase: RoundPhase::Idle,
            steps: VecDeque::new(),
            card_in_flight: false,
            deal_order: 0,
            last_verdict: None,
        }
    }

    // --- 只读访问 ---

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn player(&self) -> &Hand {
        &self.player
    }

    pub fn dealer(&self) -> &Hand {
        &self.dealer
    }

    pub fn hole_revealed(&self) -> bool {
        self.hole_revealed
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn last_verdict(&self) -> Option<Verdict> {
        self.last_verdict
    }

    /// 是否有一张牌在等待界面落定
    pub fn card_in_flight(&self) -> bool {
        self.card_in_flight
    }

    /// 是否有步骤正在进行 (发牌动画、停顿等)
    pub fn is_busy(&self) -> bool {
        self.card_in_flight || !self.steps.is_empty()
    }

    /// 某一方当前应显示的分数；庄家底牌未翻开时只显示明牌
    pub fn score_display(&self, participant: Participant) -> String {
        match participant {
            Participant::Player => self.player.display_score(),
            Participant::Dealer if !self.hole_revealed && self.dealer.len() > HOLE_POSITION => {
                hand::hole_display(&self.dealer.points())
            }
            Participant::Dealer => self.dealer.display_score(),
        }
    }

    // --- 指令 ---

    /// 开始新的一局
    ///
    /// 调用方需先成功扣除注额。清空双方手牌、重新洗牌，
    /// 然后依次给玩家、庄家、玩家各发一张明牌，再给庄家发一张暗牌。
    pub fn start_round(&mut self) -> Result<Vec<TableEvent>, TableError> {
        self.ensure("start_round", RoundPhase::Idle)?;

        self.player.clear();
        self.dealer.clear();
        self.hole_revealed = false;
        self.deal_order = 0;
        self.last_verdict = None;
        self.deck.shuffle();

        let deals = [
            (Participant::Player, true),
            (Participant::Dealer, true),
            (Participant::Player, true),
            (Participant::Dealer, false),
        ];
        for (to, face_up) in deals {
            self.queue_deal(to, face_up);
            self.steps.push_back(Step::Pace(Pause::DealPacing));
        }
        self.steps.push_back(Step::BeginPlayerTurn);

        let mut events = Vec::new();
        self.enter(RoundPhase::Dealing, &mut events);
        Ok(events)
    }

    /// 玩家要牌
    pub fn hit(&mut self) -> Result<(), TableError> {
        self.ensure_player_action("hit")?;
        self.queue_deal(Participant::Player, true);
        self.steps.push_back(Step::Pace(Pause::DealPacing));
        Ok(())
    }

    /// 玩家停牌，进入庄家回合
    pub fn stand(&mut self) -> Result<Vec<TableEvent>, TableError> {
        self.ensure_player_action("stand")?;
        self.steps.push_back(Step::RevealHole);
        self.steps.push_back(Step::Pace(Pause::Reveal));
        self.steps.push_back(Step::DealerDecide);

        let mut events = Vec::new();
        self.enter(RoundPhase::DealerTurn, &mut events);
        Ok(events)
    }

    /// 界面报告牌已落定。没有在途的牌时返回 false
    pub fn card_settled(&mut self) -> bool {
        std::mem::replace(&mut self.card_in_flight, false)
    }

    /// 结算后立即清桌，不必等结果展示结束
    ///
    /// 之后仍在计时的停顿完成时，队列已空，不会产生任何效果。
    pub fn acknowledge_reset(&mut self, ledger: &mut BettingLedger) -> Result<Vec<TableEvent>, TableError> {
        self.ensure("acknowledge_reset", RoundPhase::Settled)?;
        self.steps.clear();
        self.card_in_flight = false;

        let mut events = Vec::new();
        self.clear_table(ledger, &mut events);
        Ok(events)
    }

    // --- 步骤执行 ---

    /// 执行队列中的步骤，直到需要暂停
    pub fn advance(&mut self, ledger: &mut BettingLedger) -> Tick {
        let mut events = Vec::new();

        loop {
            if self.card_in_flight {
                return Tick { events, next: Suspend::CardSettle };
            }
            let Some(step) = self.steps.pop_front() else {
                return Tick { events, next: Suspend::AwaitInput };
            };

            match step {
                Step::Deal { to, face_up } => self.deal(to, face_up, &mut events),
                Step::Settled { to } => {
                    events.push(self.score_event(to));
                    if to == Participant::Player {
                        if let Some(verdict) = self.player_terminal() {
                            self.steps.clear();
                            self.steps.push_back(Step::Pace(Pause::Verdict));
                            self.steps.push_back(Step::Conclude(Some(verdict)));
                        }
                    }
                }
                Step::Pace(pause) => {
                    return Tick { events, next: Suspend::Pause(pause) };
                }
                Step::BeginPlayerTurn => self.enter(RoundPhase::PlayerTurn, &mut events),
                Step::RevealHole => {
                    self.hole_revealed = true;
                    if let Some(card) = self.dealer.cards().get(HOLE_POSITION) {
                        events.push(TableEvent::HoleCardRevealed { card: card.clone(), position: HOLE_POSITION });
                    }
                    events.push(self.score_event(Participant::Dealer));
                }
                Step::DealerDecide => {
                    if self.dealer.score() < DEALER_STANDS_ON {
                        self.steps.push_front(Step::DealerAfterDraw);
                        self.steps.push_front(Step::Pace(Pause::DealPacing));
                        self.steps.push_front(Step::Settled { to: Participant::Dealer });
                        self.steps.push_front(Step::Deal { to: Participant::Dealer, face_up: true });
                    } else {
                        self.steps.push_front(Step::Conclude(None));
                    }
                }
                Step::DealerAfterDraw => {
                    if self.dealer.is_bust() {
                        self.steps.push_front(Step::Conclude(None));
                    } else if self.dealer.len() >= hand::CHARLIE_CARDS {
                        self.steps.push_front(Step::Conclude(Some(Verdict::DealerFiveCards)));
                        self.steps.push_front(Step::Pace(Pause::Verdict));
                    } else {
                        self.steps.push_front(Step::DealerDecide);
                    }
                }
                Step::Conclude(verdict) => {
                    let verdict = verdict.unwrap_or_else(|| self.compare());
                    self.conclude(verdict, ledger, &mut events);
                }
                Step::ClearTable => self.clear_table(ledger, &mut events),
            }
        }
    }

    fn queue_deal(&mut self, to: Participant, face_up: bool) {
        self.steps.push_back(Step::Deal { to, face_up });
        self.steps.push_back(Step::Settled { to });
    }

    fn deal(&mut self, to: Participant, face_up: bool, events: &mut Vec<TableEvent>) {
        let card: Card = match self.deck.draw() {
            Ok(card) => card,
            Err(e) => {
                error!("{:?} 要牌时牌堆已发完 (共 {} 张)，本局作废", to, self.deck.len());
                events.push(TableEvent::Error { message: e.to_string() });
                self.steps.clear();
                self.steps.push_back(Step::Conclude(Some(Verdict::DeckExhausted)));
                return;
            }
        };

        let target = match to {
            Participant::Player => &mut self.player,
            Participant::Dealer => &mut self.dealer,
        };
        target.push(card.clone());
        let position = target.len() - 1;

        events.push(TableEvent::CardDealt { participant: to, card, face_up, position, order: self.deal_order });
        self.deal_order += 1;
        self.card_in_flight = true;
    }

    fn score_event(&self, participant: Participant) -> TableEvent {
        TableEvent::ScoreChanged { participant, display: self.score_display(participant) }
    }

    /// 玩家每拿一张牌后检查: 先看爆牌，再看五龙
    fn player_terminal(&self) -> Option<Verdict> {
        if self.player.is_bust() {
            Some(Verdict::PlayerBust)
        } else if self.player.is_five_card_charlie() {
            Some(Verdict::FiveCardCharlie)
        } else {
            None
        }
    }

    /// 比较双方分数决定胜负
    fn compare(&self) -> Verdict {
        let player = self.player.score();
        let dealer = self.dealer.score();

        if player > hand::BLACKJACK {
            Verdict::PlayerBust
        } else if dealer > hand::BLACKJACK {
            Verdict::DealerBust
        } else if player > dealer {
            Verdict::PlayerHigher
        } else if player < dealer {
            Verdict::DealerHigher
        } else {
            Verdict::Tie
        }
    }

    fn conclude(&mut self, verdict: Verdict, ledger: &mut BettingLedger, events: &mut Vec<TableEvent>) {
        let outcome = verdict.outcome();
        let credit = ledger.settle(outcome);
        info!(
            "本局结束: {:?} ({:?})，玩家 {} 点，庄家 {} 点，返还 {}",
            outcome,
            verdict,
            self.player.score(),
            self.dealer.score(),
            credit
        );

        self.last_verdict = Some(verdict);
        events.push(TableEvent::RoundResult { outcome, verdict, message: verdict.message().to_string() });
        events.push(TableEvent::BalanceChanged { balance: ledger.balance() });
        self.enter(RoundPhase::Settled, events);

        self.steps.clear();
        self.steps.push_back(Step::Pace(Pause::ResultDisplay));
        self.steps.push_back(Step::ClearTable);
    }

    fn clear_table(&mut self, ledger: &mut BettingLedger, events: &mut Vec<TableEvent>) {
        self.player.clear();
        self.dealer.clear();
        self.hole_revealed = false;
        ledger.reset_bet();

        events.push(TableEvent::TableCleared);
        events.push(TableEvent::BetChanged { bet: ledger.current_bet(), clamp: BetClamp::None });
        self.enter(RoundPhase::Idle, events);
    }

    fn enter(&mut self, phase: RoundPhase, events: &mut Vec<TableEvent>) {
        debug!("阶段 {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        events.push(TableEvent::PhaseChanged { phase });
    }

    /// 检查当前阶段是否允许该动作
    pub fn ensure(&self, action: &'static str, phase: RoundPhase) -> Result<(), TableError> {
        if self.phase != phase {
            debug!("拒绝 {}: 当前阶段为 {:?}", action, self.phase);
            return Err(TableError::InvalidStateTransition { action, phase: self.phase });
        }
        Ok(())
    }

    /// 玩家动作只在玩家回合、且没有正在进行的发牌时接受
    fn ensure_player_action(&self, action: &'static str) -> Result<(), TableError> {
        self.ensure(action, RoundPhase::PlayerTurn)?;
        if self.is_busy() {
            debug!("拒绝 {}: 上一张牌还没发完", action);
            return Err(TableError::InvalidStateTransition { action, phase: self.phase });
        }
        Ok(())
    }
}
