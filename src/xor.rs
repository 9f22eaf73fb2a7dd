use std::io::{self, Read};

const XOR_KEY: u8 = 73;

/// Assets under the extended-resource tree are shipped XOR-obfuscated.
const ENCRYPTED_SEGMENT: &str = "extendRes";

pub fn is_encrypted(url: &str) -> bool {
    url.contains(ENCRYPTED_SEGMENT)
}

pub fn decrypt(buf: &mut [u8]) {
    for byte in buf {
        *byte ^= XOR_KEY;
    }
}

/// Applies the byte-wise transform to an inner reader, chunk by chunk, so
/// bodies decrypt while they stream to disk.
pub struct XorReader<R> {
    inner: R,
}

impl<R: Read> XorReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for XorReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        decrypt(&mut buf[..read]);
        Ok(read)
    }
}
