//! Page-number-addressed, write-back-cached access to the database file.
//!
//! Modeled on the teacher's `storage::table::Pager`, but the cache holds
//! plain page-sized byte buffers rather than pre-decoded nodes — the B-tree
//! layer decides how to interpret a page. A fixed-capacity cache (mirroring
//! the teacher's `heapless::Vec<_, TABLE_MAX_PAGES>`) keeps the whole design
//! consistent with the single-process, full-memory-residency model of §5.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use heapless::FnvIndexMap;
use tracing::debug;

use crate::errors::Error;

/// Upper bound on the number of distinct pages a single process will ever
/// touch in one session. Generous for the REPL's intended scale; matches the
/// "cache everything" stance of §4.1 (no eviction policy).
pub const TABLE_MAX_PAGES: usize = 4096;

#[derive(Debug)]
pub struct Pager {
    file: File,
    page_size: usize,
    num_pages: u32,
    cache: FnvIndexMap<u32, Vec<u8>, TABLE_MAX_PAGES>,
}

impl Pager {
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Pager, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let file_len = file.metadata()?.len();
        if file_len % page_size as u64 != 0 {
            return Err(Error::CorruptFile(
                "Db file is not a whole number of pages. Corrupt file.".to_string(),
            ));
        }
        let num_pages = (file_len / page_size as u64) as u32;
        Ok(Pager {
            file,
            page_size,
            num_pages,
            cache: FnvIndexMap::new(),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Returns the page number that the next freshly-allocated page will
    /// receive.
    pub fn get_unused_page_num(&self) -> u32 {
        self.num_pages
    }

    /// Loads page `page_num` into the cache (if absent) and returns a
    /// reference to its buffer.
    pub fn get_page(&mut self, page_num: u32) -> Result<&Vec<u8>, Error> {
        if page_num as usize >= TABLE_MAX_PAGES {
            return Err(Error::PageOutOfRange(page_num));
        }

        if !self.cache.contains_key(&page_num) {
            let mut buf = vec![0u8; self.page_size];
            if page_num < self.num_pages {
                debug!(page = page_num, "pager cache miss, reading from disk");
                self.file
                    .seek(SeekFrom::Start(page_num as u64 * self.page_size as u64))?;
                self.file.read_exact(&mut buf)?;
            }
            self.cache
                .insert(page_num, buf)
                .map_err(|_| Error::PageOutOfRange(page_num))?;
        }

        if page_num >= self.num_pages {
            self.num_pages = page_num + 1;
        }

        Ok(self.cache.get(&page_num).expect("just inserted"))
    }

    /// Loads page `page_num` (as `get_page` does) and returns a mutable
    /// reference to its cached buffer.
    pub fn get_page_mut(&mut self, page_num: u32) -> Result<&mut Vec<u8>, Error> {
        self.get_page(page_num)?;
        Ok(self.cache.get_mut(&page_num).expect("just loaded"))
    }

    pub fn flush(&mut self, page_num: u32) -> Result<(), Error> {
        if let Some(buf) = self.cache.get(&page_num) {
            self.file
                .seek(SeekFrom::Start(page_num as u64 * self.page_size as u64))?;
            self.file.write_all(buf)?;
            debug!(page = page_num, "flushed page");
        }
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), Error> {
        let page_nums: Vec<u32> = self.cache.keys().copied().collect();
        for page_num in page_nums {
            self.flush(page_num)?;
        }
        self.file.flush()?;
        Ok(())
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn fresh_file_has_zero_pages() {
        let file = NamedTempFile::new().unwrap();
        let pager = Pager::open(file.path(), 128).unwrap();
        assert_eq!(pager.num_pages(), 0);
    }

    #[test]
    fn get_page_extends_num_pages() {
        let file = NamedTempFile::new().unwrap();
        let mut pager = Pager::open(file.path(), 128).unwrap();
        pager.get_page(0).unwrap();
        assert_eq!(pager.num_pages(), 1);
    }

    #[test]
    fn writes_survive_close_and_reopen() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        {
            let mut pager = Pager::open(&path, 128).unwrap();
            let page = pager.get_page_mut(0).unwrap();
            page[0] = 0xab;
            pager.close().unwrap();
        }
        {
            let mut pager = Pager::open(&path, 128).unwrap();
            let page = pager.get_page(0).unwrap();
            assert_eq!(page[0], 0xab);
        }
    }

    #[test]
    fn rejects_file_not_a_multiple_of_page_size() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 100]).unwrap();
        let err = Pager::open(file.path(), 128).unwrap_err();
        assert!(matches!(err, Error::CorruptFile(_)));
    }
}
