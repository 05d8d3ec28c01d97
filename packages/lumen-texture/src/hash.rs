//! Cache key hashing
//!
//! The key hash folds the url with a packed description of the load
//! parameters. Different parameters may collide, so the cache compares
//! entries in full after a bucket lookup.

use crate::types::{FittingMode, ImageDimensions, SamplingMode, TextureId};

const HASH_SEED: u64 = 5381;

/// djb2 over `bytes`
pub fn calculate_hash(bytes: &[u8]) -> u64 {
    bytes.iter().fold(HASH_SEED, |hash, &byte| {
        hash.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

/// Parameters folded into a cache hash
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HashParameters {
    pub size: ImageDimensions,
    pub fitting_mode: FittingMode,
    pub sampling_mode: SamplingMode,
    pub use_atlas: bool,
    pub mask_texture_id: Option<TextureId>,
    pub crop_to_mask: bool,
    pub frame_index: u32,
}

pub fn generate_hash(url: &str, parameters: &HashParameters) -> u64 {
    let mut packed: Vec<u8> = Vec::with_capacity(16);

    if !parameters.size.is_zero() {
        packed.extend_from_slice(&parameters.size.width.to_le_bytes());
        packed.extend_from_slice(&parameters.size.height.to_le_bytes());
        packed.push(
            ((parameters.fitting_mode as u8) << 4)
                | ((parameters.sampling_mode as u8) << 1)
                | u8::from(parameters.use_atlas),
        );
    } else {
        packed.push(if parameters.use_atlas { b't' } else { b'f' });
    }

    if let Some(mask) = parameters.mask_texture_id {
        packed.extend_from_slice(&mask.0.to_le_bytes());
        packed.push(u8::from(parameters.crop_to_mask));
    }

    if parameters.frame_index != 0 {
        packed.extend_from_slice(&parameters.frame_index.to_le_bytes());
    }

    calculate_hash(url.as_bytes()) ^ calculate_hash(&packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn djb2_of_empty_is_seed() {
        assert_eq!(calculate_hash(&[]), 5381);
        assert_eq!(calculate_hash(b"a"), 5381 * 33 + 97);
    }

    #[test]
    fn same_parameters_same_hash() {
        let parameters = HashParameters {
            size: ImageDimensions::new(32, 16),
            ..Default::default()
        };
        assert_eq!(
            generate_hash("a.png", &parameters),
            generate_hash("a.png", &parameters)
        );
    }

    #[test]
    fn each_parameter_changes_hash() {
        let base = HashParameters {
            size: ImageDimensions::new(32, 16),
            ..Default::default()
        };
        let reference = generate_hash("a.png", &base);

        let variants = [
            HashParameters {
                size: ImageDimensions::new(16, 32),
                ..base
            },
            HashParameters {
                fitting_mode: FittingMode::ScaleToFill,
                ..base
            },
            HashParameters {
                sampling_mode: SamplingMode::Nearest,
                ..base
            },
            HashParameters {
                use_atlas: true,
                ..base
            },
            HashParameters {
                mask_texture_id: Some(TextureId(3)),
                ..base
            },
            HashParameters {
                frame_index: 2,
                ..base
            },
        ];
        for variant in variants {
            assert_ne!(generate_hash("a.png", &variant), reference, "{variant:?}");
        }
        assert_ne!(generate_hash("b.png", &base), reference);
    }
}
