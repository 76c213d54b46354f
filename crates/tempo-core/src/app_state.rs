//! Per-wake cycle state and small shared helpers

use core::fmt;

/// Stage of a single wake cycle.
///
/// Variants are declared in execution order. The controller only ever moves
/// to [`CycleState::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleState {
    /// Sensor init, network connect and wall-clock sync
    Booting,
    /// Waiting for the cloud session to hold a usable token
    AwaitingAuth,
    /// Calibration lookup and the single sensor read
    Measuring,
    /// The single push of the measurement record
    Writing,
    /// Peripherals quiesced, deep sleep requested
    Sleeping,
}

impl CycleState {
    /// Number of states a complete cycle passes through
    pub const COUNT: usize = 5;

    /// The state that follows this one, `None` once sleeping.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Booting => Some(Self::AwaitingAuth),
            Self::AwaitingAuth => Some(Self::Measuring),
            Self::Measuring => Some(Self::Writing),
            Self::Writing => Some(Self::Sleeping),
            Self::Sleeping => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Booting => "booting",
            Self::AwaitingAuth => "awaiting-auth",
            Self::Measuring => "measuring",
            Self::Writing => "writing",
            Self::Sleeping => "sleeping",
        }
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Infallible conversion into bounded strings.
///
/// Input longer than the target capacity is cut at the last character
/// boundary that fits.
pub trait FromUnchecked<T> {
    fn from_unchecked(value: T) -> Self;
}

impl<'a, const N: usize> FromUnchecked<&'a str> for heapless::String<N> {
    fn from_unchecked(value: &'a str) -> Self {
        let mut end = value.len().min(N);
        while !value.is_char_boundary(end) {
            end -= 1;
        }

        let mut out = heapless::String::new();
        // Cannot fail: `end <= N` and lies on a char boundary.
        let _ = out.push_str(&value[..end]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_only_move_forward() {
        let mut state = CycleState::Booting;
        let mut visited = 1;
        while let Some(next) = state.next() {
            assert!(next > state);
            state = next;
            visited += 1;
        }
        assert_eq!(state, CycleState::Sleeping);
        assert_eq!(visited, CycleState::COUNT);
    }

    #[test]
    fn test_from_unchecked_truncates() {
        let s: heapless::String<4> = heapless::String::from_unchecked("PERMISSION_DENIED");
        assert_eq!(s.as_str(), "PERM");
    }

    #[test]
    fn test_from_unchecked_respects_char_boundaries() {
        // 'é' is two bytes; a 2-byte cut would split it
        let s: heapless::String<2> = heapless::String::from_unchecked("aé");
        assert_eq!(s.as_str(), "a");
    }
}
