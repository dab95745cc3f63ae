//! Output packaging: single file, directory or zip archive.

use crate::builder::STUB_FILENAME;
use crate::xml::{Document, XhtmlSerializer};
use crate::{Error, Result, ERROR_MESSAGE_CODE, INFO_MESSAGE_CODE};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

#[derive(Debug, Clone)]
pub struct ViewerFile {
    pub filename: String,
    pub document: Document,
}

impl ViewerFile {
    pub fn new(filename: String, document: Document) -> Self {
        Self { filename, document }
    }

    /// Output name with `suffix` inserted before the extension.
    pub fn output_name(&self, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) if !suffix.is_empty() && self.filename != STUB_FILENAME => {
                add_suffix(&self.filename, suffix)
            }
            _ => self.filename.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    pub zip: bool,
    /// Viewer script to bundle next to the output.
    pub copy_script: Option<PathBuf>,
    pub basename_suffix: Option<String>,
    /// Filing-documents archive to bundle next to the output.
    pub filing_documents: Option<PathBuf>,
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zip(mut self, enabled: bool) -> Self {
        self.zip = enabled;
        self
    }

    pub fn with_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.copy_script = Some(path.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.basename_suffix = Some(suffix.into());
        self
    }

    pub fn with_filing_documents(mut self, path: impl Into<PathBuf>) -> Self {
        self.filing_documents = Some(path.into());
        self
    }

    fn bundled(&self) -> impl Iterator<Item = &PathBuf> {
        self.copy_script.iter().chain(self.filing_documents.iter())
    }
}

/// The assembled viewer: the documents to write, stub page first if any.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub files: Vec<ViewerFile>,
}

impl Viewer {
    pub fn new(files: Vec<ViewerFile>) -> Self {
        Self { files }
    }

    pub fn add_file(&mut self, file: ViewerFile) {
        self.files.push(file);
    }

    /// Write the viewer to `out`: a zip archive, an existing directory, or a
    /// single file. Failures are logged before being returned.
    pub fn save(&self, out: &Path, options: &SaveOptions) -> Result<()> {
        let result = if options.zip {
            self.save_zip(out, options)
        } else if out.is_dir() {
            self.save_dir(out, options)
        } else {
            self.save_file(out, options)
        };
        result.map_err(|e| {
            log::error!(target: ERROR_MESSAGE_CODE, "{}", e);
            e
        })
    }

    fn save_zip(&self, out: &Path, options: &SaveOptions) -> Result<()> {
        if out.extension().and_then(|e| e.to_str()) != Some("zip") {
            return Err(Error::OutputTarget(format!(
                "Zip output path {} must end with .zip",
                out.display()
            )));
        }
        check_parent_dir(out)?;

        log::info!(target: INFO_MESSAGE_CODE, "Writing {}", out.display());
        let mut zip = zip::ZipWriter::new(BufWriter::new(File::create(out)?));
        let file_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let serializer = XhtmlSerializer::new();

        for file in &self.files {
            zip.start_file(file.output_name(options.basename_suffix.as_deref()), file_options)?;
            zip.write_all(&serializer.to_bytes(&file.document))?;
        }
        for path in options.bundled() {
            zip.start_file(file_name(path)?, file_options)?;
            zip.write_all(&fs::read(path)?)?;
        }
        zip.finish()?.flush()?;
        Ok(())
    }

    fn save_dir(&self, dir: &Path, options: &SaveOptions) -> Result<()> {
        for file in &self.files {
            let path = dir.join(file.output_name(options.basename_suffix.as_deref()));
            write_document(&path, &file.document)?;
        }
        copy_bundled(dir, options)
    }

    fn save_file(&self, out: &Path, options: &SaveOptions) -> Result<()> {
        if self.files.len() > 1 {
            return Err(Error::OutputTarget(
                "More than one file in input, but output is not a directory".to_string(),
            ));
        }
        let out_str = out.to_string_lossy();
        if out_str.ends_with('/') || out_str.ends_with(std::path::MAIN_SEPARATOR) {
            return Err(Error::OutputTarget(format!("Directory {} does not exist", out_str)));
        }
        let parent = check_parent_dir(out)?;
        let file = self
            .files
            .first()
            .ok_or_else(|| Error::OutputTarget("Nothing to write".to_string()))?;
        write_document(out, &file.document)?;
        copy_bundled(&parent, options)
    }
}

fn write_document(path: &Path, doc: &Document) -> Result<()> {
    log::info!(target: INFO_MESSAGE_CODE, "Writing {}", path.display());
    let mut out = BufWriter::new(File::create(path)?);
    XhtmlSerializer::new().serialize(doc, &mut out)?;
    out.flush()?;
    Ok(())
}

fn copy_bundled(dir: &Path, options: &SaveOptions) -> Result<()> {
    for path in options.bundled() {
        let dest = dir.join(file_name(path)?);
        log::info!(target: INFO_MESSAGE_CODE, "Copying {} to {}", path.display(), dest.display());
        fs::copy(path, dest)?;
    }
    Ok(())
}

fn check_parent_dir(out: &Path) -> Result<PathBuf> {
    let parent = match out.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(Error::OutputTarget(format!(
            "Directory {} does not exist",
            parent.display()
        )));
    }
    Ok(parent)
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::OutputTarget(format!("{} is not a file", path.display())))
}

fn add_suffix(filename: &str, suffix: &str) -> String {
    match filename.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}{}", &filename[..dot], suffix, &filename[dot..]),
        _ => format!("{}{}", filename, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use tempfile::TempDir;

    fn file(name: &str, body: &str) -> ViewerFile {
        let src = format!(r#"<html xmlns="http://www.w3.org/1999/xhtml"><body>{}</body></html>"#, body);
        ViewerFile::new(name.to_string(), Document::parse_str(&src).unwrap())
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(add_suffix("report.html", "_ixbrlview"), "report_ixbrlview.html");
        assert_eq!(add_suffix("a.b.xhtml", "_v"), "a.b_v.xhtml");
        assert_eq!(add_suffix("report", "_v"), "report_v");
        assert_eq!(add_suffix(".hidden", "_v"), ".hidden_v");
        assert_eq!(file(STUB_FILENAME, "").output_name(Some("_v")), STUB_FILENAME);
    }

    #[test]
    fn single_file_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.html");
        let viewer = Viewer::new(vec![file("in.html", "<br/>")]);
        viewer.save(&out, &SaveOptions::new()).unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<html xmlns=\"http://www.w3.org/1999/xhtml\"><body><br/></body></html>"
        );
    }

    #[test]
    fn single_file_errors() {
        let dir = TempDir::new().unwrap();
        let two = Viewer::new(vec![file("a.html", ""), file("b.html", "")]);
        let err = two.save(&dir.path().join("out.html"), &SaveOptions::new()).unwrap_err();
        assert!(err.to_string().contains("More than one file"));

        let one = Viewer::new(vec![file("a.html", "")]);
        let missing = format!("{}/missing/", dir.path().display());
        let err = one.save(Path::new(&missing), &SaveOptions::new()).unwrap_err();
        assert!(matches!(err, Error::OutputTarget(ref m) if m.starts_with("Directory") && m.ends_with("missing/ does not exist")));

        let err = one
            .save(&dir.path().join("missing").join("out.html"), &SaveOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::OutputTarget(ref m) if m.contains("does not exist")));
    }

    #[test]
    fn directory_output_with_suffix_and_script() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("ixbrlviewer.js");
        fs::write(&script, "// viewer").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let viewer = Viewer::new(vec![file("a.html", ""), file("b.html", "")]);
        let options = SaveOptions::new().with_suffix("_ixbrlview").with_script(&script);
        viewer.save(&out, &options).unwrap();

        let mut names: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a_ixbrlview.html", "b_ixbrlview.html", "ixbrlviewer.js"]);
    }

    #[test]
    fn zip_output() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("ixbrlviewer.js");
        fs::write(&script, "// viewer").unwrap();
        let out = dir.path().join("viewer.zip");

        let viewer = Viewer::new(vec![file("a.html", "<p>x</p>"), file("b.html", "")]);
        viewer
            .save(&out, &SaveOptions::new().zip(true).with_script(&script))
            .unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut names: Vec<_> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["a.html", "b.html", "ixbrlviewer.js"]);

        let mut content = String::new();
        archive.by_name("a.html").unwrap().read_to_string(&mut content).unwrap();
        assert!(content.ends_with("<body><p>x</p></body></html>"));
    }

    #[test]
    fn zip_requires_zip_extension() {
        let dir = TempDir::new().unwrap();
        let viewer = Viewer::new(vec![file("a.html", "")]);
        let err = viewer
            .save(&dir.path().join("viewer.tar"), &SaveOptions::new().zip(true))
            .unwrap_err();
        assert!(matches!(err, Error::OutputTarget(_)));
    }
}
