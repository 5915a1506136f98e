//! Assignment randomization
//!
//! Session identifiers and counterbalanced presentation order. Identifiers come
//! from the OS entropy source; if that is unavailable a time-seeded PRNG still
//! yields a well-formed v4 UUID, with a warning.

use crate::types::{Position, Variant, VariantOrder};
use chrono::Utc;
use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, SeedableRng, TryRngCore};
use thiserror::Error;
use tracing::warn;
use uuid::Builder;

/// The secure source could not produce bytes
#[derive(Debug, Error)]
#[error("secure entropy unavailable: {0}")]
pub struct EntropyUnavailable(pub String);

/// Source of random bytes for session identifiers
pub trait EntropySource {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyUnavailable>;
}

/// Operating-system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyUnavailable> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| EntropyUnavailable(e.to_string()))
    }
}

/// Generate a v4 session identifier from the OS entropy source
pub fn generate_session_id() -> String {
    generate_session_id_with(&mut OsEntropy)
}

/// Generate a v4 session identifier, falling back to a pseudo-random source
/// when `source` fails. Never panics.
pub fn generate_session_id_with<E: EntropySource + ?Sized>(source: &mut E) -> String {
    let mut bytes = [0u8; 16];
    match source.fill(&mut bytes) {
        Ok(()) => Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(e) => {
            warn!(
                error = %e,
                "secure random source unavailable, session id uses pseudo-random fallback"
            );
            fallback_session_id()
        }
    }
}

fn fallback_session_id() -> String {
    let now = Utc::now();
    let seed = (now.timestamp_millis() as u64).rotate_left(20)
        ^ u64::from(now.timestamp_subsec_nanos());
    let mut rng = SmallRng::seed_from_u64(seed);
    let bytes: [u8; 16] = rng.random();
    Builder::from_random_bytes(bytes).into_uuid().to_string()
}

/// Draw a presentation order with a single fair coin flip
pub fn randomize_variant_order<R: Rng + ?Sized>(rng: &mut R) -> VariantOrder {
    if rng.random_bool(0.5) {
        VariantOrder::starting_with(Variant::Control)
    } else {
        VariantOrder::starting_with(Variant::Button)
    }
}

/// The variant presented in test `position`
pub fn get_variant_for_test(order: &VariantOrder, position: Position) -> Variant {
    order.variant_at(position)
}

/// The test slot in which `variant` is presented
pub fn get_order_for_variant(order: &VariantOrder, variant: Variant) -> Position {
    order.position_of(variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use uuid::{Uuid, Variant as UuidVariant};

    struct BrokenEntropy;

    impl EntropySource for BrokenEntropy {
        fn fill(&mut self, _dest: &mut [u8]) -> Result<(), EntropyUnavailable> {
            Err(EntropyUnavailable("no device".to_string()))
        }
    }

    struct FixedEntropy(u8);

    impl EntropySource for FixedEntropy {
        fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyUnavailable> {
            dest.fill(self.0);
            Ok(())
        }
    }

    fn assert_v4_layout(id: &str) {
        assert_eq!(id.len(), 36);
        let parsed = Uuid::parse_str(id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(parsed.get_variant(), UuidVariant::RFC4122);
        assert_eq!(&id[14..15], "4");
        assert!(matches!(&id[19..20], "8" | "9" | "a" | "b"));
    }

    #[test]
    fn test_session_id_is_v4() {
        assert_v4_layout(&generate_session_id());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn test_fixed_entropy_sets_version_bits() {
        let id = generate_session_id_with(&mut FixedEntropy(0xff));
        assert_eq!(id, "ffffffff-ffff-4fff-bfff-ffffffffffff");
    }

    #[test]
    fn test_fallback_still_yields_v4() {
        let id = generate_session_id_with(&mut BrokenEntropy);
        assert_v4_layout(&id);
    }

    #[test]
    fn test_order_lookups_are_inverse() {
        for first in Variant::ALL {
            let order = VariantOrder::starting_with(first);
            for position in Position::ALL {
                let variant = get_variant_for_test(&order, position);
                assert_eq!(get_order_for_variant(&order, variant), position);
            }
            for variant in Variant::ALL {
                let position = get_order_for_variant(&order, variant);
                assert_eq!(get_variant_for_test(&order, position), variant);
            }
        }
    }

    #[test]
    fn test_known_order_lookup() {
        let order = VariantOrder::starting_with(Variant::Button);
        assert_eq!(get_variant_for_test(&order, Position::First), Variant::Button);
        assert_eq!(get_variant_for_test(&order, Position::Second), Variant::Control);
        assert_eq!(get_order_for_variant(&order, Variant::Control), Position::Second);
    }

    #[test]
    fn test_randomized_order_is_balanced() {
        let mut rng = StdRng::seed_from_u64(42);
        let control_first = (0..2000)
            .map(|_| randomize_variant_order(&mut rng))
            .filter(|o| o.variant_at(Position::First) == Variant::Control)
            .count();
        assert!((800..1200).contains(&control_first), "got {control_first}");
    }

    #[test]
    fn test_randomized_order_is_deterministic_for_seed() {
        let a = randomize_variant_order(&mut StdRng::seed_from_u64(7));
        let b = randomize_variant_order(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
