use crate::error::{BetClamp, TableError};
use serde::{Deserialize, Serialize};

/// 默认初始余额
pub const DEFAULT_BALANCE: u32 = 10_000;
/// 默认单局下注上限
pub const DEFAULT_MAX_BET: u32 = 1_000;

/// 一局的结果 (以玩家视角)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Push,
    /// 牌局因故作废 (例如牌堆发完)，退还本金
    Void,
}

/// 一次下注调整的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetChange {
    pub bet: u32,
    pub clamp: BetClamp,
}

/// 下注账本: 余额和当前注额
///
/// 注额在开局时 (`commit_bet`) 才真正从余额中扣除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BettingLedger {
    balance: u32,
    current_bet: u32,
    max_bet: u32,
}

impl Default for BettingLedger {
    fn default() -> Self {
        Self::new(DEFAULT_BALANCE, DEFAULT_MAX_BET)
    }
}

impl BettingLedger {
    pub fn new(balance: u32, max_bet: u32) -> Self {
        Self { balance, current_bet: 0, max_bet }
    }

    pub fn balance(&self) -> u32 {
        self.balance
    }

    pub fn current_bet(&self) -> u32 {
        self.current_bet
    }

    pub fn max_bet(&self) -> u32 {
        self.max_bet
    }

    /// 加注
    ///
    /// 注额不超过 `min(余额, 上限)`。余额低于上限且请求超过余额时报余额不足，
    /// 否则达到 (含恰好等于) 上限报上限提示。
    pub fn place_bet(&mut self, delta: u32) -> BetChange {
        let wanted = self.current_bet.saturating_add(delta);

        let clamp = if wanted > self.balance && self.balance < self.max_bet {
            BetClamp::InsufficientFunds
        } else if wanted >= self.max_bet {
            BetClamp::MaxBet
        } else {
            BetClamp::None
        };
        self.current_bet = wanted.min(self.balance).min(self.max_bet);

        BetChange { bet: self.current_bet, clamp }
    }

    /// 减注，最低到 0
    pub fn reduce_bet(&mut self, delta: u32) -> BetChange {
        self.current_bet = self.current_bet.saturating_sub(delta);
        BetChange { bet: self.current_bet, clamp: BetClamp::None }
    }

    /// 正数加注，负数减注
    pub fn adjust_bet(&mut self, delta: i64) -> BetChange {
        let amount = u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX);
        if delta >= 0 {
            self.place_bet(amount)
        } else {
            self.reduce_bet(amount)
        }
    }

    pub fn clear_bet(&mut self) -> BetChange {
        self.current_bet = 0;
        BetChange { bet: 0, clamp: BetClamp::None }
    }

    /// 开局时扣除注额，这是钱离开余额的唯一入口
    pub fn commit_bet(&mut self) -> Result<u32, TableError> {
        if self.current_bet == 0 {
            return Err(TableError::ZeroBet);
        }
        self.balance -= self.current_bet;
        Ok(self.current_bet)
    }

    /// 按结果结算，返回返还给玩家的金额
    ///
    /// 赢: 返还本金加等额奖金；平局或作废: 只返还本金；输: 不返还 (本金在开局时已扣)。
    pub fn settle(&mut self, outcome: Outcome) -> u32 {
        let credit = match outcome {
            Outcome::Win => self.current_bet.saturating_mul(2),
            Outcome::Push | Outcome::Void => self.current_bet,
            Outcome::Loss => 0,
        };
        self.balance = self.balance.saturating_add(credit);
        credit
    }

    /// 清桌后把注额归零，准备下一局
    pub fn reset_bet(&mut self) {
        self.current_bet = 0;
    }
}

// --- 单元测试 ---
