use crate::round::RoundPhase;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 牌桌引擎的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// 没有下注就想开局，可恢复，本局不会开始
    #[error("请先下注再开始游戏")]
    ZeroBet,

    /// 在不允许的阶段调用了动作 (比如发牌途中点了要牌)
    #[error("当前阶段 {phase:?} 不能执行 {action}")]
    InvalidStateTransition { action: &'static str, phase: RoundPhase },

    /// 牌堆已经发完
    #[error("牌堆已发完")]
    DeckExhausted,

    #[error("配置无效: {0}")]
    InvalidConfig(String),
}

/// 调整下注时触发的限制，供界面显示对应的警告
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetClamp {
    None,
    /// 达到单局下注上限
    MaxBet,
    /// 余额不足
    InsufficientFunds,
}

/// 通过事件通道发给界面的可恢复警告
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Warning {
    ZeroBet,
    MaxBet,
    InsufficientFunds,
}

impl BetClamp {
    pub fn warning(self) -> Option<Warning> {
        match self {
            BetClamp::None => None,
            BetClamp::MaxBet => Some(Warning::MaxBet),
            BetClamp::InsufficientFunds => Some(Warning::InsufficientFunds),
        }
    }
}
