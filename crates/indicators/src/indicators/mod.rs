pub mod bollinger;
pub mod chaikin;
pub mod macd;
pub mod momentum;
pub mod parabolic_sar;
pub mod rsi;
pub mod tema;
pub mod vroc;

pub use bollinger::{BollingerBands, BollingerParams};
pub use chaikin::{ChaikinOscillator, ChaikinParams};
pub use macd::{Macd, MacdParams};
pub use momentum::{Momentum, MomentumParams};
pub use parabolic_sar::{ParabolicSar, SarParams, SarPosition, SarState};
pub use rsi::{RsiParams, RelativeStrengthIndex};
pub use tema::{TemaParams, TripleExponentialMovingAverage};
pub use vroc::{VolumeRateOfChange, VrocParams};
