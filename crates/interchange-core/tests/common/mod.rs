use std::fs;
use std::path::{Path, PathBuf};

pub fn read_file(path: &Path) -> String {
    fs::read_to_string(path).expect("Failed to read file")
}

/// Every `.rep` file under `tests/samples/<group>`, sorted by name.
pub fn samples(group: &str) -> Vec<(String, String)> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/samples")
        .join(group);
    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
        .expect("Failed to read samples directory")
        .map(|entry| entry.expect("Failed to read directory entry").path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "rep"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .expect("Sample names are UTF-8")
                .to_string();
            (name, read_file(&path))
        })
        .collect()
}
