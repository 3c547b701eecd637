//! Positional codec used to clone a pin or hand its state to a new window.
//!
//! ```text
//! expanding (bool) | committed scale (f64) | opacity (f64) | step scale (f64) | shadow (bool)
//! ```
//! No markers: only ever exchanged between trusted peers on the same host.

use super::state::{Interaction, PinState, SCALE_EPSILON};
use crate::wire::{WireError, WireReader, WireWriter};

/// Size of the layout without the trailing shadow flag, still accepted.
const LEGACY_PACK_LEN: usize = 1 + 8 + 8 + 8;

impl PinState {
    /// Serialize the transform and appearance fields.
    pub fn pack(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.put_bool(self.expanding)
            .put_f64(self.committed_scale)
            .put_f64(self.opacity)
            .put_f64(self.step_scale)
            .put_bool(self.shadow_enabled);
        w.into_bytes()
    }

    /// Rebuild a state from [`PinState::pack`] output.
    ///
    /// An empty buffer yields the defaults. A step scale away from 1.0 marks
    /// the state dirty so the first repaint uses the hydrated size.
    pub fn unpack(bytes: &[u8]) -> Result<PinState, WireError> {
        let mut state = PinState::default();
        if bytes.is_empty() {
            return Ok(state);
        }

        let mut r = WireReader::new(bytes);
        state.expanding = r.bool()?;
        state.committed_scale = positive_or_default(r.f64()?);
        state.opacity = finite_or_default(r.f64()?).clamp(0.0, 1.0);
        state.step_scale = positive_or_default(r.f64()?);
        state.shadow_enabled = if bytes.len() == LEGACY_PACK_LEN {
            true
        } else {
            r.bool()?
        };

        if (state.step_scale - 1.0).abs() > SCALE_EPSILON {
            state.size_changed = true;
            state.interaction = Interaction::Scrolling;
        }
        Ok(state)
    }
}

/// Non-finite values fall back to 1.0, the default of every packed float.
fn finite_or_default(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        1.0
    }
}

/// Scales must be finite and above zero.
fn positive_or_default(value: f64) -> f64 {
    match finite_or_default(value) {
        v if v > 0.0 => v,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::state::{transition, PinEvent};

    #[test]
    fn test_unpack_empty_gives_defaults() {
        let state = PinState::unpack(&[]).unwrap();
        assert!(!state.expanding());
        assert_eq!(state.committed_scale(), 1.0);
        assert_eq!(state.opacity(), 1.0);
        assert_eq!(state.step_scale(), 1.0);
        assert!(state.shadow_enabled());
        assert!(!state.size_changed());
    }

    #[test]
    fn test_pack_layout_and_round_trip() {
        let state = PinState {
            expanding: true,
            committed_scale: 1.75,
            opacity: 0.4,
            step_scale: 1.0,
            shadow_enabled: false,
            ..PinState::default()
        };
        let bytes = state.pack();
        assert_eq!(bytes.len(), LEGACY_PACK_LEN + 1);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..9], &1.75f64.to_be_bytes());

        let restored = PinState::unpack(&bytes).unwrap();
        assert!(restored.expanding());
        assert_eq!(restored.committed_scale(), 1.75);
        assert_eq!(restored.opacity(), 0.4);
        assert!(!restored.shadow_enabled());
        assert!(!restored.size_changed());
    }

    #[test]
    fn test_mid_burst_step_marks_dirty() {
        let state = PinState {
            step_scale: 1.3,
            ..PinState::default()
        };
        let restored = PinState::unpack(&state.pack()).unwrap();
        assert!(restored.size_changed());
        assert_eq!(restored.step_scale(), 1.3);

        // The hydrated burst is folded by the next quiet tick.
        let folded = transition(&restored, &PinEvent::Tick { now_ms: 0 }).state;
        assert_eq!(folded.committed_scale(), 1.3);
        assert_eq!(folded.step_scale(), 1.0);
    }

    #[test]
    fn test_step_within_epsilon_is_clean() {
        let state = PinState {
            step_scale: 1.00005,
            ..PinState::default()
        };
        assert!(!PinState::unpack(&state.pack()).unwrap().size_changed());
    }

    #[test]
    fn test_legacy_layout_enables_shadow() {
        let state = PinState {
            shadow_enabled: false,
            ..PinState::default()
        };
        let bytes = state.pack();
        let restored = PinState::unpack(&bytes[..LEGACY_PACK_LEN]).unwrap();
        assert!(restored.shadow_enabled());
    }

    #[test]
    fn test_truncated_buffer_fails() {
        let bytes = PinState::default().pack();
        assert!(matches!(
            PinState::unpack(&bytes[..10]),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn test_out_of_range_opacity_is_clamped() {
        let state = PinState {
            opacity: 3.0,
            ..PinState::default()
        };
        assert_eq!(PinState::unpack(&state.pack()).unwrap().opacity(), 1.0);
    }

    #[test]
    fn test_non_finite_fields_fall_back_to_defaults() {
        let mut bytes = PinState::default().pack();
        bytes[1..9].copy_from_slice(&(-2.0f64).to_be_bytes());
        bytes[9..17].copy_from_slice(&f64::NAN.to_be_bytes());
        bytes[17..25].copy_from_slice(&f64::INFINITY.to_be_bytes());

        let restored = PinState::unpack(&bytes).unwrap();
        assert_eq!(restored.committed_scale(), 1.0);
        assert_eq!(restored.opacity(), 1.0);
        assert_eq!(restored.step_scale(), 1.0);
        assert!(!restored.size_changed());
    }

    #[test]
    fn test_clone_mid_burst_settles_like_source() {
        let source = PinState {
            expanding: true,
            step_scale: 1.3,
            interaction: Interaction::Scrolling,
            last_scroll_ms: Some(0),
            ..PinState::default()
        };
        let clone = PinState::unpack(&source.pack()).unwrap();
        assert!(clone.expanding());

        let tick = PinEvent::Tick { now_ms: 500 };
        let source = transition(&source, &tick).state;
        let clone = transition(&clone, &tick).state;
        assert_eq!(clone.committed_scale(), source.committed_scale());
        assert_eq!(clone.step_scale(), source.step_scale());
        assert_eq!(clone.expanding(), source.expanding());
    }
}
