//! Streaming sinks consumed by [`crate::process::GitRunner::run_with_stdout`]:
//! a tar extractor, a single-entry tar decoder, and a hashing writer.
//! Expressed as plain functions taking `&mut dyn Read` rather than a
//! push-based `on_stdout`/`on_finish` trait, since `tar::Archive` already
//! wants a `Read` and re-wrapping it in a callback interface would only add
//! an intermediate buffer.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Extracts a tar stream into `dest`, setting directory mode `0o555` and
/// file mode `0o444`. Contents under a content-addressed cache directory
/// are never meant to be edited in place.
pub fn extract_tar(reader: &mut dyn Read, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    let mut archive = tar::Archive::new(reader);
    archive.unpack(dest)?;
    lock_down_permissions(dest)
}

#[cfg(unix)]
fn lock_down_permissions(root: &Path) -> io::Result<()> {
    for entry in walk(root)? {
        let entry = entry?;
        let mode = if entry.file_type()?.is_dir() { 0o555 } else { 0o444 };
        fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode))?;
    }
    fs::set_permissions(root, fs::Permissions::from_mode(0o555))
}

#[cfg(not(unix))]
fn lock_down_permissions(_root: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn walk(root: &Path) -> io::Result<Vec<io::Result<fs::DirEntry>>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                stack.push(entry.path());
            }
            out.push(Ok(entry));
        }
    }
    Ok(out)
}

/// Pipes a stream into `dest_file` while hashing it, returning the hex
/// SHA-256 digest. Used by `archive(dest)`, which writes the raw
/// `git archive` stream (not necessarily unpacked) to a single file.
pub fn hash_to_file(reader: &mut dyn Read, dest_file: &Path) -> io::Result<String> {
    let mut file = fs::File::create(dest_file)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n])?;
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Decodes a tar stream expected to contain exactly one entry, returning
/// its UTF-8 decoded content. Returns `Ok(None)` if the stream has no
/// entries (the `git archive --remote` single-file form never emits this,
/// but an empty stream is handled rather than panicking).
pub fn decode_single_tar_entry(reader: &mut dyn Read) -> io::Result<Option<String>> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = archive.entries()?;
    let Some(entry) = entries.next() else {
        return Ok(None);
    };
    let mut entry = entry?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    let text = String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn build_single_entry_tar(name: &str, content: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content).unwrap();
        builder.into_inner().unwrap()
    }

    #[test]
    fn decodes_single_tar_entry_to_utf8() {
        let bytes = build_single_entry_tar("package.json", b"{\"name\":\"x\"}");
        let mut cursor = Cursor::new(bytes);
        let decoded = decode_single_tar_entry(&mut cursor).unwrap();
        assert_eq!(decoded.as_deref(), Some("{\"name\":\"x\"}"));
    }

    #[test]
    fn empty_stream_decodes_to_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let decoded = decode_single_tar_entry(&mut cursor).unwrap();
        assert_eq!(decoded, None);
    }

    #[test]
    fn hash_to_file_writes_content_and_returns_digest() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("archive.tar");
        let mut cursor = Cursor::new(b"hello world".to_vec());
        let digest = hash_to_file(&mut cursor, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"hello world");
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn extract_tar_unpacks_entries() {
        let bytes = build_single_entry_tar("pkg/file.txt", b"content");
        let mut cursor = Cursor::new(bytes);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        extract_tar(&mut cursor, &dest).unwrap();
        assert_eq!(fs::read(dest.join("pkg/file.txt")).unwrap(), b"content");
    }
}
