use crate::error::TableError;
use rand::SeedableRng;
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- 核心数据结构定义 ---

/// 花色 (Suit)
/// 21 点的计分与花色无关，花色只用来给标准牌组里的牌命名
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Spade,   // 黑桃 ♠️
    Heart,   // 红心 ♥️
    Club,    // 梅花 ♣️
    Diamond, // 方块 ♦️
}

/// 点数 (Rank)
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven,
        Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
    ];

    /// 该点数在 21 点中的分值，A 按软值 11 计
    pub fn point(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => ACE_POINT,
        }
    }
}

/// A 的软值
pub const ACE_POINT: u8 = 11;

/// 单张牌 (Card)
/// 只保存牌名和分值，牌组由外部配置提供，不一定是完整的 52 张
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    pub point: u8,
}

impl Card {
    pub fn new(name: impl Into<String>, point: u8) -> Card {
        Card { name: name.into(), point }
    }

    /// 按标准扑克牌生成，例如 `♠️A`
    pub fn standard(rank: Rank, suit: Suit) -> Card {
        Card::new(format!("{}{}", suit, rank), rank.point())
    }

    pub fn is_ace(&self) -> bool {
        self.point == ACE_POINT
    }
}

// --- 实现辅助功能 ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Spade => "♠️",
            Suit::Heart => "♥️",
            Suit::Club => "♣️",
            Suit::Diamond => "♦️",
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// 创建一副完整的 52 张扑克牌
pub fn standard_cards() -> Vec<Card> {
    let suits = [Suit::Spade, Suit::Heart, Suit::Club, Suit::Diamond];
    let mut cards = Vec::with_capacity(52);
    for &suit in &suits {
        for &rank in &Rank::ALL {
            cards.push(Card::standard(rank, suit));
        }
    }
    cards
}

// --- 牌堆 ---

/// 洗牌方式
#[derive(Debug, Clone)]
enum Order {
    /// 真正的随机洗牌
    Shuffled(StdRng),
    /// 固定顺序，洗牌只会把游标拨回开头
    Stacked,
}

/// 单副牌的牌堆
///
/// 牌本身不会被移除，发牌只是推进 `draw_index`。
/// 每局开始都会重新洗整副牌，所以牌堆不会跨局延续。
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
    draw_index: usize,
    order: Order,
}

impl Deck {
    /// 使用系统熵源洗牌的牌堆，构造时即洗一次
    pub fn new(cards: Vec<Card>) -> Deck {
        Deck::with_order(cards, Order::Shuffled(StdRng::from_os_rng()))
    }

    /// 使用固定种子，方便复现牌局
    pub fn seeded(cards: Vec<Card>, seed: u64) -> Deck {
        Deck::with_order(cards, Order::Shuffled(StdRng::seed_from_u64(seed)))
    }

    /// 按给定顺序发牌，不洗牌
    pub fn stacked(cards: Vec<Card>) -> Deck {
        Deck::with_order(cards, Order::Stacked)
    }

    /// 洗好的标准 52 张
    pub fn standard() -> Deck {
        Deck::new(standard_cards())
    }

    fn with_order(cards: Vec<Card>, order: Order) -> Deck {
        let mut deck = Deck { cards, draw_index: 0, order };
        deck.shuffle();
        deck
    }

    /// 洗整副牌并把游标归零
    pub fn shuffle(&mut self) {
        if let Order::Shuffled(rng) = &mut self.order {
            // Fisher-Yates
            self.cards.shuffle(rng);
        }
        self.draw_index = 0;
    }

    /// 发出游标处的牌，然后游标加一
    pub fn draw(&mut self) -> Result<Card, TableError> {
        let card = self.cards.get(self.draw_index).cloned().ok_or(TableError::DeckExhausted)?;
        self.draw_index += 1;
        Ok(card)
    }

    pub fn draw_index(&self) -> usize {
        self.draw_index
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.draw_index
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// 当前洗牌顺序下的整副牌
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

// --- 单元测试 ---
