use std::io::Read;
use std::path::Path;

/// Reads a script as raw bytes; the compiler does its own UTF-8 checking.
/// A path of `-` reads standard input.
pub fn load_script(path: &Path) -> Result<Vec<u8>, std::io::Error> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read(path)
}
