// src/common/clock.rs

use portable_atomic::{AtomicU32, Ordering};

use super::hal_traits::{Clock, Millis};

/// Millisecond counter advanced by a periodic interrupt.
///
/// Place one in a `static`, call [`TickCounter::tick`] from the 1 kHz tick
/// handler and hand `&TICKS` to whatever needs a [`Clock`].
///
/// ```
/// use firewatch::common::{Clock, TickCounter};
///
/// static TICKS: TickCounter = TickCounter::new();
///
/// fn systick_handler() {
///     TICKS.tick();
/// }
///
/// systick_handler();
/// assert_eq!((&TICKS).now().0, 1);
/// ```
#[derive(Debug, Default)]
pub struct TickCounter {
    millis: AtomicU32,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            millis: AtomicU32::new(0),
        }
    }

    /// Advances the counter by one millisecond. Only the tick source calls this.
    #[inline]
    pub fn tick(&self) {
        self.millis.fetch_add(1, Ordering::Relaxed);
    }
}

impl Clock for TickCounter {
    fn now(&self) -> Millis {
        Millis(self.millis.load(Ordering::Relaxed))
    }
}
