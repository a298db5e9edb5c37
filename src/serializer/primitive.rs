//! Little-endian fixed-size serializers for numeric types.

use crate::error::{DiskArrayError, Result};

use super::{Encoded, FixedSizeSerializer, Serializer};

macro_rules! le_serializer {
    ($(#[$meta:meta])* $name:ident, $ty:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Serializer<$ty> for $name {
            fn try_serialize(&self, value: &$ty, output: &mut [u8]) -> Result<Encoded> {
                const SIZE: usize = std::mem::size_of::<$ty>();
                if output.len() < SIZE {
                    return Ok(Encoded::BufferTooSmall { required: Some(SIZE) });
                }
                output[..SIZE].copy_from_slice(&value.to_le_bytes());
                Ok(Encoded::Written(SIZE))
            }

            fn deserialize(&self, input: &[u8]) -> Result<$ty> {
                const SIZE: usize = std::mem::size_of::<$ty>();
                let bytes: [u8; SIZE] = input
                    .get(..SIZE)
                    .and_then(|b| b.try_into().ok())
                    .ok_or_else(|| {
                        DiskArrayError::Serialization(format!(
                            "expected {} bytes for {}, got {}",
                            SIZE,
                            stringify!($ty),
                            input.len()
                        ))
                    })?;
                Ok(<$ty>::from_le_bytes(bytes))
            }
        }

        impl FixedSizeSerializer<$ty> for $name {
            fn element_size(&self) -> usize {
                std::mem::size_of::<$ty>()
            }
        }
    };
}

le_serializer!(
    /// `i32` as 4 little-endian bytes
    I32Serializer,
    i32
);
le_serializer!(
    /// `i64` as 8 little-endian bytes
    I64Serializer,
    i64
);
le_serializer!(
    /// `u32` as 4 little-endian bytes
    U32Serializer,
    u32
);
le_serializer!(
    /// `u64` as 8 little-endian bytes
    U64Serializer,
    u64
);
le_serializer!(
    /// `f64` as 8 little-endian bytes
    F64Serializer,
    f64
);
