//! Arithmetic challenge-response gate

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Arithmetic operator used in a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Add => write!(f, "+"),
            Operator::Subtract => write!(f, "-"),
            Operator::Multiply => write!(f, "×"),
        }
    }
}

/// A single arithmetic question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    pub left: i64,
    pub right: i64,
    pub op: Operator,
}

impl Challenge {
    /// Generate a question with small operands. Subtraction never goes negative.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let op = match rng.gen_range(0..3) {
            0 => Operator::Add,
            1 => Operator::Subtract,
            _ => Operator::Multiply,
        };
        let (mut left, mut right) = match op {
            Operator::Multiply => (rng.gen_range(1..=10), rng.gen_range(1..=10)),
            _ => (rng.gen_range(1..=20), rng.gen_range(1..=20)),
        };
        if op == Operator::Subtract && left < right {
            std::mem::swap(&mut left, &mut right);
        }
        Self { left, right, op }
    }

    pub fn question(&self) -> String {
        format!("What is {} {} {}?", self.left, self.op, self.right)
    }

    pub fn answer(&self) -> i64 {
        match self.op {
            Operator::Add => self.left + self.right,
            Operator::Subtract => self.left - self.right,
            Operator::Multiply => self.left * self.right,
        }
    }

    /// Whether `input` (surrounding whitespace ignored) is the correct answer
    pub fn check(&self, input: &str) -> bool {
        input
            .trim()
            .parse::<i64>()
            .map(|n| n == self.answer())
            .unwrap_or(false)
    }
}

/// Holds the current challenge and replaces it after every attempt
pub struct ChallengeGate {
    rng: StdRng,
    current: Challenge,
}

impl ChallengeGate {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic gate for tests and reproducible sessions
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let current = Challenge::generate(&mut rng);
        Self { rng, current }
    }

    /// The question the user must answer next
    pub fn question(&self) -> String {
        self.current.question()
    }

    pub fn current(&self) -> &Challenge {
        &self.current
    }

    /// Check an answer. A fresh challenge is generated whether or not it was correct.
    pub fn attempt(&mut self, input: &str) -> bool {
        let passed = self.current.check(input);
        tracing::debug!(passed, "challenge attempt");
        self.current = Challenge::generate(&mut self.rng);
        passed
    }
}

impl Default for ChallengeGate {
    fn default() -> Self {
        Self::new()
    }
}
