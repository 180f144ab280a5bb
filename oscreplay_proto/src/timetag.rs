//! Fixed-point OSC time tags.

use core::{fmt, ops, time::Duration};
use serde::{Deserialize, Serialize};

/// Seconds between the OSC epoch (1900-01-01) and the Unix epoch (1970-01-01).
pub const UNIX_EPOCH_OFFSET_SECS: u32 = 2_208_988_800;

// 2^32, the weight of one whole second in fraction units
const FRACTION_SCALE: f64 = 4_294_967_296.0;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A point in time (or a span of time), as `seconds + fraction / 2^32`.
///
/// Ordering compares seconds first, then fractions, which matches the
/// numeric order of the underlying 64-bit fixed-point value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timetag {
    pub seconds: u32,
    pub fraction: u32,
}

impl Timetag {
    /// Reserved value meaning "dispatch immediately".
    pub const IMMEDIATE: Self = Self::new(0, 1);

    /// Size of the encoded form, in bytes.
    pub const SIZE: usize = 2 * size_of::<u32>();

    #[inline(always)]
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        Self { seconds, fraction }
    }

    #[inline(always)]
    pub const fn is_immediate(&self) -> bool {
        self.seconds == Self::IMMEDIATE.seconds && self.fraction == Self::IMMEDIATE.fraction
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        // a clock set before 1970 is pinned to the Unix epoch
        let since_unix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);

        Self::from_unix(since_unix)
    }

    /// Converts a duration elapsed since the Unix epoch.
    ///
    /// Seconds wrap modulo 2^32, which is the OSC era rollover.
    #[inline]
    pub fn from_unix(since_unix: Duration) -> Self {
        let span = Self::from_duration_wrapping(since_unix);
        Self::new(span.seconds.wrapping_add(UNIX_EPOCH_OFFSET_SECS), span.fraction)
    }

    /// Converts a span of time, saturating at the largest representable value.
    #[inline]
    pub fn from_duration(span: Duration) -> Self {
        match u32::try_from(span.as_secs()) {
            Ok(seconds) => Self::new(seconds, nanos_to_fraction(span.subsec_nanos())),
            Err(_) => Self::new(u32::MAX, u32::MAX),
        }
    }

    #[inline(always)]
    fn from_duration_wrapping(span: Duration) -> Self {
        // truncation is the modulo 2^32 we want here
        Self::new(span.as_secs() as u32, nanos_to_fraction(span.subsec_nanos()))
    }

    /// Splits a delay in seconds into whole seconds and fraction.
    ///
    /// Both parts are rounded down. Delays that are not finite and positive map to
    /// zero, delays beyond `u32::MAX` seconds saturate.
    pub fn from_delay(delay_secs: f64) -> Self {
        if !(delay_secs.is_finite() && delay_secs > 0.) {
            return Self::default();
        }

        let whole = delay_secs.floor();

        if whole >= FRACTION_SCALE {
            return Self::new(u32::MAX, u32::MAX);
        }

        let fraction = ((delay_secs - whole) * FRACTION_SCALE).floor();

        // float to int casts saturate, so a fraction rounding up to 2^32 stays in range
        Self::new(whole as u32, fraction as u32)
    }

    /// `self + rhs`, with the fraction overflow carried into the seconds.
    ///
    /// Each field wraps modulo 2^32.
    #[inline(always)]
    pub const fn wrapping_add(self, rhs: Self) -> Self {
        let (fraction, carry) = self.fraction.overflowing_add(rhs.fraction);
        let seconds = self
            .seconds
            .wrapping_add(rhs.seconds)
            .wrapping_add(carry as u32);

        Self { seconds, fraction }
    }

    /// `self - rhs`, with the fraction underflow borrowed from the seconds.
    ///
    /// Each field wraps modulo 2^32.
    #[inline(always)]
    pub const fn wrapping_sub(self, rhs: Self) -> Self {
        let (fraction, borrow) = self.fraction.overflowing_sub(rhs.fraction);
        let seconds = self
            .seconds
            .wrapping_sub(rhs.seconds)
            .wrapping_sub(borrow as u32);

        Self { seconds, fraction }
    }

    /// `self - earlier`, in (possibly negative) seconds.
    #[inline]
    pub fn diff_seconds(self, earlier: Self) -> f64 {
        (f64::from(self.seconds) - f64::from(earlier.seconds))
            + (f64::from(self.fraction) - f64::from(earlier.fraction)) / FRACTION_SCALE
    }

    /// Big-endian encoding: seconds, then fraction.
    #[inline]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0; Self::SIZE];
        let (seconds, fraction) = bytes.split_at_mut(size_of::<u32>());
        seconds.copy_from_slice(&self.seconds.to_be_bytes());
        fraction.copy_from_slice(&self.fraction.to_be_bytes());
        bytes
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        let [s0, s1, s2, s3, f0, f1, f2, f3] = bytes;

        Self::new(
            u32::from_be_bytes([s0, s1, s2, s3]),
            u32::from_be_bytes([f0, f1, f2, f3]),
        )
    }
}

#[inline(always)]
fn nanos_to_fraction(nanos: u32) -> u32 {
    // nanos < 10^9, so the quotient is < 2^32
    ((u64::from(nanos) << 32) / NANOS_PER_SEC) as u32
}

impl ops::Add for Timetag {
    type Output = Self;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
}

impl ops::Sub for Timetag {
    type Output = Self;

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }
}

impl fmt::Display for Timetag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}.{:08x}", self.seconds, self.fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TWO_POW_32: u64 = 1 << 32;

    proptest! {
        #[test]
        fn add_carries_exactly_once(a in any::<Timetag>(), b in any::<Timetag>()) {
            let sum = a + b;
            let frac_sum = u64::from(a.fraction) + u64::from(b.fraction);
            let carry = u32::from(frac_sum >= TWO_POW_32);

            prop_assert_eq!(sum.fraction, (frac_sum % TWO_POW_32) as u32);
            prop_assert_eq!(
                sum.seconds,
                a.seconds.wrapping_add(b.seconds).wrapping_add(carry)
            );
        }

        #[test]
        fn sub_borrows_exactly_once(a in any::<Timetag>(), b in any::<Timetag>()) {
            let diff = a - b;
            let borrow = u32::from(a.fraction < b.fraction);

            prop_assert_eq!(diff.fraction, a.fraction.wrapping_sub(b.fraction));
            prop_assert_eq!(
                diff.seconds,
                a.seconds.wrapping_sub(b.seconds).wrapping_sub(borrow)
            );
        }

        #[test]
        fn sub_undoes_add(a in any::<Timetag>(), b in any::<Timetag>()) {
            prop_assert_eq!((a + b) - b, a);
        }

        #[test]
        fn matches_64_bit_fixed_point(a in any::<Timetag>(), b in any::<Timetag>()) {
            let as_u64 = |t: Timetag| (u64::from(t.seconds) << 32) | u64::from(t.fraction);
            prop_assert_eq!(as_u64(a + b), as_u64(a).wrapping_add(as_u64(b)));
            prop_assert_eq!(as_u64(a - b), as_u64(a).wrapping_sub(as_u64(b)));
        }

        #[test]
        fn delay_split_never_exceeds_input(delay in 0.0f64..1.0e6) {
            let split = Timetag::from_delay(delay);
            let back = f64::from(split.seconds) + f64::from(split.fraction) / FRACTION_SCALE;

            prop_assert!(back <= delay);
            prop_assert!(delay - back < 1e-6);
        }
    }

    impl Arbitrary for Timetag {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            (any::<u32>(), any::<u32>())
                .prop_map(|(seconds, fraction)| Timetag::new(seconds, fraction))
                .boxed()
        }
    }

    #[test]
    fn carry_at_boundary() {
        let a = Timetag::new(10, u32::MAX);
        let b = Timetag::new(0, 1);
        assert_eq!(a + b, Timetag::new(11, 0));

        let half = Timetag::new(0, 1 << 31);
        assert_eq!(half + half, Timetag::new(1, 0));
    }

    #[test]
    fn borrow_at_boundary() {
        assert_eq!(Timetag::new(11, 0) - Timetag::new(0, 1), Timetag::new(10, u32::MAX));
        assert_eq!(Timetag::new(0, 0) - Timetag::new(0, 1), Timetag::new(u32::MAX, u32::MAX));
    }

    #[test]
    fn delay_split_rounds_down() {
        assert_eq!(Timetag::from_delay(2.5), Timetag::new(2, 1 << 31));
        assert_eq!(Timetag::from_delay(3.0), Timetag::new(3, 0));
        assert_eq!(Timetag::from_delay(0.25), Timetag::new(0, 1 << 30));
    }

    #[test]
    fn delay_split_rejects_garbage() {
        assert_eq!(Timetag::from_delay(0.), Timetag::default());
        assert_eq!(Timetag::from_delay(-1.5), Timetag::default());
        assert_eq!(Timetag::from_delay(f64::NAN), Timetag::default());
        assert_eq!(Timetag::from_delay(f64::INFINITY), Timetag::default());
        assert_eq!(Timetag::from_delay(1e12), Timetag::new(u32::MAX, u32::MAX));
    }

    #[test]
    fn diff_seconds_is_signed() {
        let a = Timetag::new(101, 1 << 31);
        let b = Timetag::new(100, 0);
        assert_eq!(a.diff_seconds(b), 1.5);
        assert_eq!(b.diff_seconds(a), -1.5);
        assert_eq!(a.diff_seconds(a), 0.);
    }

    #[test]
    fn unix_conversion() {
        let t = Timetag::from_unix(Duration::new(1, 500_000_000));
        assert_eq!(t, Timetag::new(UNIX_EPOCH_OFFSET_SECS + 1, 1 << 31));
    }

    #[test]
    fn from_duration_saturates() {
        assert_eq!(
            Timetag::from_duration(Duration::from_millis(250)),
            Timetag::new(0, 1 << 30)
        );
        assert_eq!(
            Timetag::from_duration(Duration::from_secs(u64::MAX)),
            Timetag::new(u32::MAX, u32::MAX)
        );
    }

    #[test]
    fn now_is_past_2020() {
        // 2020-01-01 in OSC seconds
        assert!(Timetag::now().seconds > 3_786_825_600);
    }

    #[test]
    fn bytes_are_big_endian() {
        let t = Timetag::new(0x0102_0304, 0x0506_0708);
        assert_eq!(t.to_bytes(), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(Timetag::from_bytes(t.to_bytes()), t);
    }

    #[test]
    fn immediate_sentinel() {
        assert!(Timetag::IMMEDIATE.is_immediate());
        assert!(!Timetag::new(0, 0).is_immediate());
        assert_eq!(Timetag::IMMEDIATE.to_string(), "00000000.00000001");
    }

    #[test]
    fn serde_postcard() {
        let t = Timetag::new(100, 42);
        let bytes = postcard::to_allocvec(&t).unwrap();
        assert_eq!(postcard::from_bytes::<Timetag>(&bytes).unwrap(), t);
    }
}
