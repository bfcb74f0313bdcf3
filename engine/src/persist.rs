use crate::dictionary::CustomDictionary;
use crate::error::{EngineError, Result};
use crate::index::{Document, InvertedIndex};
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub num_docs: u32,
    pub vocabulary_size: usize,
    pub created_at: String,
    pub source_root: String,
}

/// Everything one snapshot holds on disk.
pub struct Snapshot {
    pub docs: Vec<Document>,
    pub index: InvertedIndex,
    pub dictionary: CustomDictionary,
    pub texts: Vec<String>,
    pub meta: MetaFile,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn docs(dir: &Path) -> PathBuf { dir.join("docs.bin") }
    fn postings(dir: &Path) -> PathBuf { dir.join("postings.bin") }
    fn dictionary(dir: &Path) -> PathBuf { dir.join("custom_dict.txt") }
    fn meta(dir: &Path) -> PathBuf { dir.join("meta.json") }
    fn texts(dir: &Path) -> PathBuf { dir.join("texts") }
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.root.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "index".into());
        name.push(suffix);
        self.root.with_file_name(name)
    }
    pub fn staging(&self) -> PathBuf { self.sibling(".staging") }
    pub fn previous(&self) -> PathBuf { self.sibling(".previous") }

    pub fn exists(&self) -> bool { Self::meta(&self.root).is_file() }
}

/// Write the snapshot to a staging directory, then swap it in by rename.
pub fn save_snapshot(paths: &IndexPaths, snap: &Snapshot) -> Result<()> {
    let staging = paths.staging();
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    create_dir_all(IndexPaths::texts(&staging))?;

    write_bincode(&IndexPaths::docs(&staging), &snap.docs)?;
    write_bincode(&IndexPaths::postings(&staging), &snap.index)?;
    save_dictionary(&IndexPaths::dictionary(&staging), &snap.dictionary)?;
    for (doc_id, text) in snap.texts.iter().enumerate() {
        fs::write(IndexPaths::texts(&staging).join(format!("{doc_id}.txt")), text)?;
    }
    let json = serde_json::to_string_pretty(&snap.meta)?;
    fs::write(IndexPaths::meta(&staging), json)?;

    let previous = paths.previous();
    if previous.exists() {
        fs::remove_dir_all(&previous)?;
    }
    if paths.root.exists() {
        fs::rename(&paths.root, &previous)?;
    }
    if let Err(err) = fs::rename(&staging, &paths.root) {
        // put the old snapshot back so the directory is never left empty
        if previous.exists() {
            if let Err(restore) = fs::rename(&previous, &paths.root) {
                tracing::error!(
                    root = %paths.root.display(),
                    previous = %previous.display(),
                    error = %restore,
                    "failed to restore previous snapshot"
                );
            }
        }
        return Err(err.into());
    }
    discard_previous(&previous);
    tracing::info!(root = %paths.root.display(), num_docs = snap.meta.num_docs, "snapshot written");
    Ok(())
}

/// Best-effort removal of the superseded snapshot. Returns whether it is gone.
fn discard_previous(previous: &Path) -> bool {
    if !previous.exists() {
        return true;
    }
    match fs::remove_dir_all(previous) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(path = %previous.display(), error = %err, "could not remove previous snapshot");
            false
        }
    }
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<Snapshot> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        return Err(EngineError::CorruptSnapshot(format!(
            "unsupported snapshot version {} (expected {FORMAT_VERSION})",
            meta.version
        )));
    }
    let docs: Vec<Document> = read_bincode(&IndexPaths::docs(&paths.root))?;
    let index: InvertedIndex = read_bincode(&IndexPaths::postings(&paths.root))?;
    let dictionary = load_dictionary(&IndexPaths::dictionary(&paths.root))?;
    let texts = docs
        .iter()
        .map(|d| fs::read_to_string(IndexPaths::texts(&paths.root).join(format!("{}.txt", d.doc_id))))
        .collect::<std::io::Result<Vec<String>>>()?;

    let ids_dense = docs.iter().enumerate().all(|(i, d)| d.doc_id as usize == i);
    if docs.len() != meta.num_docs as usize || !ids_dense || !index.check_integrity(docs.len()) {
        return Err(EngineError::CorruptSnapshot(format!("snapshot at {} is inconsistent", paths.root.display())));
    }
    Ok(Snapshot { docs, index, dictionary, texts, meta })
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(IndexPaths::meta(&paths.root))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

fn save_dictionary(path: &Path, dict: &CustomDictionary) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    for term in dict.iter() {
        writeln!(f, "{term}")?;
    }
    f.flush()?;
    Ok(())
}

fn load_dictionary(path: &Path) -> Result<CustomDictionary> {
    let raw = fs::read_to_string(path)?;
    Ok(CustomDictionary::new(raw.lines().map(str::to_string)))
}

fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bincode<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}
