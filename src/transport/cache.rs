//! Cache transport: read-through local compressed cache wrapping another
//! transport, coordinated across processes via a lockfile.
//!
//! For a resource with deterministic hash `H` under cache directory `D`:
//! finished cache file `D/H.cache` (gzip), in-progress `D/H.cache.temp`,
//! writer lock `D/H.cache.lock`. All three share a filesystem so the final
//! rename is atomic. No header is written inside the cache file -- it holds
//! exactly the bytes the upstream transport produced.
//!
//! The cache file is read back with a raw [`flate2::read::GzDecoder`] rather
//! than through [`crate::transport::file::FileTransport`]'s `oneio` layer:
//! `oneio`, like the teacher's own `io.rs`, dispatches decompression by file
//! extension, and `<hash>.cache` doesn't carry the `.gz` suffix that would
//! trigger it.

use crate::error::{ParserError, ParserResult};
use crate::resource::Resource;
use crate::transport::Transport;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

fn resource_hash(resource: &Resource) -> String {
    let mut hasher = DefaultHasher::new();
    resource.uri.hash(&mut hasher);
    resource.project.hash(&mut hasher);
    resource.collector.hash(&mut hasher);
    resource.initial_time.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

enum Inner {
    /// Serving bytes straight from a previously finished cache file.
    CacheHit(GzDecoder<BufReader<File>>),
    /// First open for this resource: this session holds the write lock and
    /// tees upstream bytes into `D/H.cache.temp` as they're read. One
    /// `GzEncoder` lives for the writer's whole lifetime so the temp file
    /// ends up a single gzip member, not one per `read` call.
    Writer {
        upstream: Box<dyn Transport>,
        encoder: Option<GzEncoder<File>>,
        temp_path: PathBuf,
        cache_path: PathBuf,
        lock_path: PathBuf,
        finished: bool,
    },
    /// Another writer holds the lock: readers that lose the O_EXCL race
    /// fall back to reading through upstream without caching.
    PassThrough(Box<dyn Transport>),
}

pub struct CacheTransport {
    inner: Inner,
}

impl CacheTransport {
    pub fn new(
        resource: &Resource,
        cache_dir: &Path,
        upstream_factory: impl FnOnce() -> ParserResult<Box<dyn Transport>>,
    ) -> ParserResult<Self> {
        fs::create_dir_all(cache_dir)?;
        let hash = resource_hash(resource);
        let cache_path = cache_dir.join(format!("{}.cache", hash));
        let temp_path = cache_dir.join(format!("{}.cache.temp", hash));
        let lock_path = cache_dir.join(format!("{}.cache.lock", hash));

        if cache_path.exists() {
            let file = File::open(&cache_path)?;
            let decoder = GzDecoder::new(BufReader::with_capacity(1 << 20, file));
            return Ok(CacheTransport {
                inner: Inner::CacheHit(decoder),
            });
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => {
                let temp_file = File::create(&temp_path)?;
                let encoder = GzEncoder::new(temp_file, Compression::default());
                Ok(CacheTransport {
                    inner: Inner::Writer {
                        upstream: upstream_factory()?,
                        encoder: Some(encoder),
                        temp_path,
                        cache_path,
                        lock_path,
                        finished: false,
                    },
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                log::debug!(
                    "cache lock {} held by another writer, reading through without caching",
                    lock_path.display()
                );
                Ok(CacheTransport {
                    inner: Inner::PassThrough(upstream_factory()?),
                })
            }
            Err(e) => Err(ParserError::Io(e)),
        }
    }

    fn finalize_writer(
        encoder: &mut Option<GzEncoder<File>>,
        temp_path: &Path,
        cache_path: &Path,
        lock_path: &Path,
    ) -> ParserResult<()> {
        if let Some(encoder) = encoder.take() {
            encoder.finish()?;
        }
        fs::rename(temp_path, cache_path)?;
        let _ = fs::remove_file(lock_path);
        Ok(())
    }
}

impl Transport for CacheTransport {
    fn read(&mut self, buf: &mut [u8]) -> ParserResult<usize> {
        match &mut self.inner {
            Inner::CacheHit(t) => match t.read(buf) {
                Ok(n) => Ok(n),
                Err(e) => Err(ParserError::Corrupted(format!(
                    "cache file read failed: {}",
                    e
                ))),
            },
            Inner::PassThrough(t) => t.read(buf),
            Inner::Writer {
                upstream,
                encoder,
                temp_path,
                cache_path,
                lock_path,
                finished,
            } => {
                let n = upstream.read(buf)?;
                if n == 0 {
                    if !*finished {
                        *finished = true;
                        Self::finalize_writer(encoder, temp_path, cache_path, lock_path)?;
                    }
                    return Ok(0);
                }
                encoder
                    .as_mut()
                    .expect("encoder only taken once finished")
                    .write_all(&buf[..n])?;
                Ok(n)
            }
        }
    }

    fn readline(&mut self, buf: &mut Vec<u8>) -> ParserResult<usize> {
        match &mut self.inner {
            Inner::CacheHit(t) => {
                let before = buf.len();
                let mut byte = [0u8; 1];
                loop {
                    match t.read(&mut byte) {
                        Ok(0) => break,
                        Ok(_) => {
                            if byte[0] == b'\n' {
                                break;
                            }
                            buf.push(byte[0]);
                        }
                        Err(e) => {
                            return Err(ParserError::Corrupted(format!(
                                "cache file readline failed: {}",
                                e
                            )))
                        }
                    }
                }
                Ok(buf.len() - before)
            }
            Inner::PassThrough(t) => t.readline(buf),
            Inner::Writer {
                upstream,
                encoder,
                temp_path,
                cache_path,
                lock_path,
                finished,
            } => {
                let before = buf.len();
                let n = upstream.readline(buf)?;
                if n == 0 {
                    if !*finished {
                        *finished = true;
                        Self::finalize_writer(encoder, temp_path, cache_path, lock_path)?;
                    }
                    return Ok(0);
                }
                let encoder = encoder.as_mut().expect("encoder only taken once finished");
                encoder.write_all(&buf[before..])?;
                encoder.write_all(b"\n")?;
                Ok(n)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{FormatKind, RecordKindFilter, Resource, TransportKind};
    use tempfile::TempDir;

    fn test_resource() -> Resource {
        Resource::new(
            TransportKind::File,
            FormatKind::Mrt,
            "http://example.test/x".into(),
            1_000,
            60,
            "test-project",
            "test-collector",
            RecordKindFilter::Update,
        )
    }

    struct FakeUpstream {
        chunks: Vec<Vec<u8>>,
        idx: usize,
    }
    impl Transport for FakeUpstream {
        fn read(&mut self, buf: &mut [u8]) -> ParserResult<usize> {
            if self.idx >= self.chunks.len() {
                return Ok(0);
            }
            let chunk = &self.chunks[self.idx];
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            self.idx += 1;
            Ok(n)
        }
        fn readline(&mut self, _buf: &mut Vec<u8>) -> ParserResult<usize> {
            unimplemented!()
        }
    }

    #[test]
    fn writes_then_second_open_serves_cache_hit_across_multiple_reads() {
        let dir = TempDir::new().unwrap();
        let resource = test_resource();
        // multiple short reads exercise that the cache file ends up one
        // continuous gzip stream, not one member per `read` call.
        let chunks = vec![b"hello ".to_vec(), b"cache ".to_vec(), b"world".to_vec()];
        let full: Vec<u8> = chunks.concat();

        {
            let mut transport = CacheTransport::new(&resource, dir.path(), || {
                Ok(Box::new(FakeUpstream {
                    chunks: chunks.clone(),
                    idx: 0,
                }) as Box<dyn Transport>)
            })
            .unwrap();
            let mut buf = vec![0u8; 1024];
            let mut total = Vec::new();
            loop {
                let n = transport.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                total.extend_from_slice(&buf[..n]);
            }
            assert_eq!(total, full);
        }

        let hash = resource_hash(&resource);
        assert!(dir.path().join(format!("{}.cache", hash)).exists());
        assert!(!dir.path().join(format!("{}.cache.lock", hash)).exists());

        // second open should be a cache hit reading the gzip file back.
        let mut transport = CacheTransport::new(&resource, dir.path(), || {
            panic!("upstream factory should not be called on cache hit")
        })
        .unwrap();
        assert!(matches!(transport.inner, Inner::CacheHit(_)));
        let mut out = Vec::new();
        let mut buf = [0u8; 4]; // deliberately small to span multiple reads
        loop {
            let n = transport.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, full);
    }

    #[test]
    fn concurrent_open_falls_back_without_caching() {
        let dir = TempDir::new().unwrap();
        let resource = test_resource();
        let hash = resource_hash(&resource);
        let lock_path = dir.path().join(format!("{}.cache.lock", hash));
        File::create(&lock_path).unwrap();

        let mut transport = CacheTransport::new(&resource, dir.path(), || {
            Ok(Box::new(FakeUpstream {
                chunks: vec![b"abc".to_vec()],
                idx: 0,
            }) as Box<dyn Transport>)
        })
        .unwrap();
        assert!(matches!(transport.inner, Inner::PassThrough(_)));
        let mut buf = [0u8; 8];
        let n = transport.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"abc");
        // lockfile untouched by the losing reader.
        assert!(lock_path.exists());
    }
}
