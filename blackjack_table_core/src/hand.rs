use crate::card::{ACE_POINT, Card};
use serde::{Deserialize, Serialize};

/// 爆牌线
pub const BLACKJACK: u32 = 21;
/// 五张不爆即触发五龙规则
pub const CHARLIE_CARDS: usize = 5;

// --- 计分函数 ---

/// 计算一手牌的分数
///
/// A 先按 11 计，总分超过 21 时逐张把 A 降为 1 (减 10)，
/// 直到不爆或者没有可降的 A 为止。
pub fn score(values: &[u8]) -> u32 {
    let mut total: u32 = values.iter().map(|&v| v as u32).sum();
    let mut soft_aces = values.iter().filter(|&&v| v == ACE_POINT).count();

    while total > BLACKJACK && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }

    total
}

/// 界面上显示的分数
///
/// 降级之后若仍有 A 按 11 计，同时显示硬分和软分，例如 A+6 显示 `7/17`，
/// A+A 显示 `2/12`；否则只显示降级后的单一分数。
pub fn display_score(values: &[u8]) -> String {
    let high: u32 = values.iter().map(|&v| v as u32).sum();
    let aces = values.iter().filter(|&&v| v == ACE_POINT).count() as u32;
    let total = score(values);
    let demoted = (high - total) / 10;

    if aces > demoted {
        format!("{}/{}", total - 10, total)
    } else {
        total.to_string()
    }
}

/// 庄家底牌未翻开时显示的分数: 只看第一张明牌
pub fn hole_display(values: &[u8]) -> String {
    match values.first() {
        Some(&ACE_POINT) => "1/11".to_string(),
        Some(v) => v.to_string(),
        None => "0".to_string(),
    }
}

pub fn is_bust(values: &[u8]) -> bool {
    score(values) > BLACKJACK
}

/// 五张牌且没有爆
pub fn is_five_card_charlie(values: &[u8]) -> bool {
    values.len() >= CHARLIE_CARDS && !is_bust(values)
}

// --- 手牌 ---

/// 一方 (玩家或庄家) 的手牌，本局内只增不减
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn points(&self) -> Vec<u8> {
        self.cards.iter().map(|c| c.point).collect()
    }

    pub fn score(&self) -> u32 {
        score(&self.points())
    }

    pub fn display_score(&self) -> String {
        display_score(&self.points())
    }

    pub fn is_bust(&self) -> bool {
        is_bust(&self.points())
    }

    pub fn is_five_card_charlie(&self) -> bool {
        is_five_card_charlie(&self.points())
    }
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_simple() {
        assert_eq!(score(&[2, 3]), 5);
        assert_eq!(score(&[10, 10]), 20);
        assert_eq!(score(&[]), 0);
    }

    #[test]
    fn test_score_soft_ace() {
        assert_eq!(score(&[11, 6]), 17);
        assert_eq!(score(&[11, 10]), 21);
    }

    #[test]
    fn test_score_demotes_aces_one_by_one() {
        assert_eq!(score(&[11, 11, 9]), 21); // 一张 A 降级
        assert_eq!(score(&[11, 11, 11]), 13); // 两张 A 降级
        assert_eq!(score(&[11, 6, 9]), 16);
        assert_eq!(score(&[11, 11, 11, 11]), 14);
    }

    #[test]
    fn test_score_bust_even_with_aces() {
        // 所有 A 都降为 1 后仍然爆牌
        assert_eq!(score(&[11, 10, 10, 5]), 26);
        assert_eq!(score(&[10, 10, 5]), 25);
    }

    #[test]
    fn test_score_bounds() {
        // 分数总在 [A 全算 1, A 全算 11] 之间
        let hands: [&[u8]; 6] = [&[11, 6], &[11, 11, 9], &[11, 11, 11], &[10, 9, 8], &[2, 11, 3, 11], &[11, 10, 10, 5]];
        for hand in hands {
            let high: u32 = hand.iter().map(|&v| v as u32).sum();
            let aces = hand.iter().filter(|&&v| v == 11).count() as u32;
            let low = high - 10 * aces;
            let s = score(hand);
            assert!(s >= low && s <= high, "{:?} => {}", hand, s);
            if low <= 21 {
                assert!(s <= 21, "{:?} 本可以不爆却得到 {}", hand, s);
            }
        }
    }

    #[test]
    fn test_score_order_independent() {
        assert_eq!(score(&[11, 9, 11]), score(&[9, 11, 11]));
        assert_eq!(score(&[5, 11, 10]), score(&[11, 10, 5]));
    }

    #[test]
    fn test_display_score() {
        assert_eq!(display_score(&[11, 6]), "7/17");
        assert_eq!(display_score(&[10, 9]), "19");
        assert_eq!(display_score(&[11, 11]), "2/12");
        assert_eq!(display_score(&[11]), "1/11");
        assert_eq!(display_score(&[11, 10]), "11/21");
    }

    #[test]
    fn test_display_score_after_demotion() {
        // 降级后还剩一张软 A 就显示两个分数，全部降级则只显示一个
        let cases: [(&[u8], &str); 6] = [
            (&[11, 11], "2/12"),
            (&[11, 11, 9], "11/21"),
            (&[11, 11, 11], "3/13"),
            (&[11, 6, 9], "16"),
            (&[11, 10, 10, 5], "26"),
            (&[2, 11, 3, 11], "7/17"),
        ];
        for (values, expected) in cases {
            assert_eq!(display_score(values), expected, "{:?}", values);
        }
    }

    #[test]
    fn test_hole_display() {
        assert_eq!(hole_display(&[11, 9]), "1/11");
        assert_eq!(hole_display(&[10, 11]), "10");
        assert_eq!(hole_display(&[7]), "7");
    }

    #[test]
    fn test_five_card_charlie() {
        assert!(is_five_card_charlie(&[2, 3, 2, 3, 5]));
        assert!(!is_five_card_charlie(&[2, 3, 2, 3]));
        assert!(!is_five_card_charlie(&[10, 5, 2, 3, 5]));
        assert!(is_bust(&[10, 5, 2, 3, 5]));
    }

    #[test]
    fn test_hand_struct() {
        let mut hand = Hand::new();
        hand.push(Card::new("A", 11));
        hand.push(Card::new("6", 6));
        assert_eq!(hand.len(), 2);
        assert_eq!(hand.score(), 17);
        assert_eq!(hand.display_score(), "7/17");
        hand.push(Card::new("9", 9));
        assert_eq!(hand.score(), 16);
        assert!(!hand.is_bust());
        hand.clear();
        assert!(hand.is_empty());
    }
}
