use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::opcode::Tiers;

/// A loaded instruction buffer, ready to run.
///
/// With the unified-memory tier enabled the buffer holds the source verbatim
/// (comments included, since the program may address them as data). Otherwise
/// it holds only the bytes that are legal opcodes under the tier set, in
/// source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    code: Vec<u8>,
}

impl Program {
    /// Load a program from a seekable byte source.
    ///
    /// The filtered policy makes two passes: the first counts legal opcodes so
    /// the buffer can be reserved at its exact size, the second copies them.
    pub fn load<R: Read + Seek>(mut source: R, tiers: Tiers) -> Result<Self> {
        let code = if tiers.unified() {
            let len = source.seek(SeekFrom::End(0))?;
            source.seek(SeekFrom::Start(0))?;
            let len = usize::try_from(len)
                .map_err(|_| Error::OutOfMemory { cells: usize::MAX })?;

            let mut code = Vec::new();
            code.try_reserve_exact(len)
                .map_err(|_| Error::OutOfMemory { cells: len })?;
            source.read_to_end(&mut code)?;
            debug!(len = code.len(), "loaded raw program");
            code
        } else {
            let len = legal_bytes(&mut source, tiers)
                .try_fold(0usize, |n, b| b.map(|_| n + 1))?;
            source.seek(SeekFrom::Start(0))?;

            let mut code = Vec::new();
            code.try_reserve_exact(len)
                .map_err(|_| Error::OutOfMemory { cells: len })?;
            for byte in legal_bytes(&mut source, tiers) {
                code.push(byte?);
            }
            debug!(len = code.len(), ?tiers, "loaded filtered program");
            code
        };

        Ok(Self { code })
    }

    /// Open `path` and load it. A missing file is reported as `Error::NotFound`.
    pub fn load_path(path: impl AsRef<Path>, tiers: Tiers) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })?;
        debug!(path = %path.display(), "opened program source");
        Self::load(BufReader::new(file), tiers)
    }

    /// Load from an in-memory source with the same policy as [`Program::load`].
    pub fn from_bytes(source: &[u8], tiers: Tiers) -> Result<Self> {
        Self::load(Cursor::new(source), tiers)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Iterate over the bytes of `source` that `tiers` accepts.
fn legal_bytes<R: Read>(source: R, tiers: Tiers) -> impl Iterator<Item = io::Result<u8>> {
    source
        .bytes()
        .filter(move |b| b.as_ref().map_or(true, |&b| tiers.allows(b)))
}
