use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// `<input>.data.json` and `<input>.label.json`, next to the input file.
pub fn output_paths(input: &Path) -> (PathBuf, PathBuf) {
    let with_suffix = |suffix: &str| {
        let mut path = OsString::from(input.as_os_str());
        path.push(suffix);
        PathBuf::from(path)
    };
    (with_suffix(".data.json"), with_suffix(".label.json"))
}

/// The two JSON-lines outputs. Line `k` of each file always describes the
/// same tweet.
pub struct OutputPair {
    data: BufWriter<File>,
    labels: BufWriter<File>,
    written: usize,
}

impl OutputPair {
    /// Create both files, truncating any previous run's output.
    pub async fn create(data: &Path, labels: &Path) -> std::io::Result<Self> {
        Ok(Self {
            data: BufWriter::new(File::create(data).await?),
            labels: BufWriter::new(File::create(labels).await?),
            written: 0,
        })
    }

    pub async fn write<D: Serialize, L: Serialize>(
        &mut self,
        data: &D,
        label: &L,
    ) -> std::io::Result<()> {
        // Serialize both before writing either so a failure can't misalign the files
        let mut data = serde_json::to_vec(data)?;
        let mut label = serde_json::to_vec(label)?;
        data.push(b'\n');
        label.push(b'\n');
        self.data.write_all(&data).await?;
        self.labels.write_all(&label).await?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        self.data.flush().await?;
        self.labels.flush().await
    }
}
