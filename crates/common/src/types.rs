use serde::{Deserialize, Serialize};

/// Discrete trading signal derived from an indicator's latest values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    #[default]
    Hold,
    Sell,
}

impl Signal {
    /// Numeric encoding used in feature matrices: buy = -1, hold = 0, sell = 1.
    pub fn code(self) -> i8 {
        match self {
            Signal::Buy => -1,
            Signal::Hold => 0,
            Signal::Sell => 1,
        }
    }

    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Signal::Buy),
            0 => Some(Signal::Hold),
            1 => Some(Signal::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "buy"),
            Signal::Hold => write!(f, "hold"),
            Signal::Sell => write!(f, "sell"),
        }
    }
}

/// Forward price direction over the label horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Up,
    Down,
}

impl Label {
    /// up = 1, down = 0.
    pub fn code(self) -> u8 {
        match self {
            Label::Up => 1,
            Label::Down => 0,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Label::Up),
            0 => Some(Label::Down),
            _ => None,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Up => write!(f, "up"),
            Label::Down => write!(f, "down"),
        }
    }
}

/// OHLCV columns accepted on ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::Open,
        Column::High,
        Column::Low,
        Column::Close,
        Column::Volume,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::Volume => "volume",
        }
    }

    /// Case-insensitive lookup; surrounding whitespace is ignored.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
