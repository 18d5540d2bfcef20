use rand::Rng;
use std::ops::RangeInclusive;
#[cfg(test)] use std::sync::Mutex;



#[cfg(test)]
/// automock expectations for static methods are global - hold this lock to avoid races
pub static MOCK_RANDOM_MUTEX: Mutex<()> = Mutex::new(());

/// Source of randomness for the altitude generator. Methods are static so that generators can
///  be parameterized by type, and tests can swap in a mock without threading an instance around.
#[cfg_attr(test, mockall::automock)]
pub trait Random {
    fn gen_f64_range(range: RangeInclusive<f64>) -> f64;
}
pub struct RngRandom {}
impl Random for RngRandom {
    fn gen_f64_range(range: RangeInclusive<f64>) -> f64 {
        rand::rng().random_range(range)
    }
}
