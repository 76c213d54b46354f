use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use heapless::Vec;
use log::{debug, warn};

use super::{KeyValueStore, MAX_KEYS, MemoryStore, StoreError, StoreKey, StoredValue};

/// "TEMP", little-endian
const IMAGE_MAGIC: u32 = 0x504D_4554;

/// magic (4) + payload length (2) + Fletcher-16 of the payload (2)
const HEADER_LEN: usize = 8;

/// Bytes read and written per commit. A multiple of every common NOR
/// read/write granularity.
pub const IMAGE_SIZE: usize = 64;

/// Persistent store kept as a single image in one erase sector.
///
/// Every commit erases the sector and rewrites the whole image, so the entries
/// written by one [`KeyValueStore::set_all`] land together or not at all. The
/// node commits at most once per calibration refresh, which keeps wear
/// negligible.
///
/// Binary format (little-endian):
/// - magic: 4 bytes (u32)
/// - payload length: 2 bytes (u16)
/// - checksum: 2 bytes (Fletcher-16 over the payload)
/// - payload: postcard-encoded `[(StoreKey, StoredValue)]`
///
/// A blank sector reads as an empty store; a damaged one is logged and also
/// treated as empty so the next commit repairs it.
pub struct FlashStore<F: NorFlash> {
    flash: F,
    /// Sector-aligned offset of the image
    offset: u32,
    cache: Option<MemoryStore>,
}

impl<F: NorFlash> FlashStore<F> {
    /// `offset` must be aligned to `F::ERASE_SIZE`.
    pub fn new(flash: F, offset: u32) -> Self {
        Self {
            flash,
            offset,
            cache: None,
        }
    }

    /// Release the underlying flash.
    pub fn into_inner(self) -> F {
        self.flash
    }

    fn load(&mut self) -> Result<&mut MemoryStore, StoreError> {
        if self.cache.is_none() {
            let mut image = [0u8; IMAGE_SIZE];
            self.flash
                .read(self.offset, &mut image)
                .map_err(|_| StoreError::Flash { operation: "read" })?;

            let store = match decode_image(&image) {
                Ok(store) => store,
                Err(e) => {
                    warn!("Discarding stored image at {:#x}: {}", self.offset, e);
                    MemoryStore::new()
                }
            };
            if store.is_empty() {
                debug!("No stored entries at {:#x}", self.offset);
            } else {
                debug!("Loaded {} stored entries", store.len());
            }
            self.cache = Some(store);
        }

        // Populated just above
        self.cache.as_mut().ok_or(StoreError::Corrupt)
    }

    fn commit(&mut self, next: MemoryStore) -> Result<(), StoreError> {
        let mut image = [0xFFu8; IMAGE_SIZE];
        let used = encode_image(&next, &mut image)?;
        let write_len = used.div_ceil(F::WRITE_SIZE) * F::WRITE_SIZE;
        if write_len > IMAGE_SIZE {
            return Err(StoreError::Full);
        }

        self.flash
            .erase(self.offset, self.offset + F::ERASE_SIZE as u32)
            .map_err(|_| StoreError::Flash { operation: "erase" })?;
        self.flash
            .write(self.offset, &image[..write_len])
            .map_err(|_| StoreError::Flash { operation: "write" })?;

        self.cache = Some(next);
        Ok(())
    }
}

impl<F: NorFlash> KeyValueStore for FlashStore<F> {
    fn get(&mut self, key: StoreKey) -> Result<Option<StoredValue>, StoreError> {
        self.load()?.get(key)
    }

    fn set(&mut self, key: StoreKey, value: StoredValue) -> Result<(), StoreError> {
        self.set_all(&[(key, value)])
    }

    fn set_all(&mut self, entries: &[(StoreKey, StoredValue)]) -> Result<(), StoreError> {
        let mut next = self.load()?.clone();
        next.set_all(entries)?;
        self.commit(next)
    }
}

fn encode_image(store: &MemoryStore, image: &mut [u8; IMAGE_SIZE]) -> Result<usize, StoreError> {
    let payload_len = postcard::to_slice(store.entries(), &mut image[HEADER_LEN..])
        .map_err(|_| StoreError::Full)?
        .len();
    let checksum = fletcher16(&image[HEADER_LEN..HEADER_LEN + payload_len]);

    image[0..4].copy_from_slice(&IMAGE_MAGIC.to_le_bytes());
    image[4..6].copy_from_slice(&(payload_len as u16).to_le_bytes());
    image[6..8].copy_from_slice(&checksum.to_le_bytes());

    Ok(HEADER_LEN + payload_len)
}

fn decode_image(image: &[u8; IMAGE_SIZE]) -> Result<MemoryStore, StoreError> {
    let magic = u32::from_le_bytes([image[0], image[1], image[2], image[3]]);
    if magic != IMAGE_MAGIC {
        // Erased or never written
        return Ok(MemoryStore::new());
    }

    let payload_len = u16::from_le_bytes([image[4], image[5]]) as usize;
    if payload_len > IMAGE_SIZE - HEADER_LEN {
        return Err(StoreError::Corrupt);
    }

    let payload = &image[HEADER_LEN..HEADER_LEN + payload_len];
    let checksum = u16::from_le_bytes([image[6], image[7]]);
    if fletcher16(payload) != checksum {
        return Err(StoreError::Corrupt);
    }

    let entries: Vec<(StoreKey, StoredValue), MAX_KEYS> =
        postcard::from_bytes(payload).map_err(|_| StoreError::Corrupt)?;
    Ok(MemoryStore::from_entries(entries))
}

fn fletcher16(data: &[u8]) -> u16 {
    let (mut a, mut b) = (0u16, 0u16);
    for &byte in data {
        a = (a + byte as u16) % 255;
        b = (b + a) % 255;
    }
    (b << 8) | a
}
