//! # 21 点牌桌核心逻辑库
//!
//! 这个 `core` crate 包含单副牌 21 点一局游戏的全部规则:
//! 牌堆、带 A 降级的计分、发牌 → 玩家回合 → 庄家回合 → 结算的状态机，
//! 以及把输赢换算成余额变化的下注账本。
//! 它不关心牌怎么画、动画怎么播，只通过指令和事件与上层 (服务器、客户端界面) 交互。

mod card;
mod error;
mod hand;
mod ledger;
mod message;
mod round;
mod table;

pub use card::*;

pub use error::*;

pub use hand::*;

pub use ledger::*;

pub use message::*;

pub use round::*;

pub use table::*;
