use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::deadline::Deadline;
use crate::error::BidsheetError;
use crate::extraction::{looks_scanned, Page, PdfExtractor, PositionedToken, ScanDetector};

/// PDF extraction backend using pdftotext (from poppler-utils).
///
/// Uses `pdftotext -layout` for the page-text layer and
/// `pdftotext -bbox-layout` for word-level bounding boxes. Each child process
/// is killed once the caller's deadline expires.
pub struct PdftotextExtractor;

/// How often a running pdftotext is checked against the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl PdftotextExtractor {
    pub fn new() -> Self {
        PdftotextExtractor
    }

}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for PdftotextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8], deadline: &Deadline) -> Result<Vec<Page>, BidsheetError> {
        // The temp file is removed when `tmpfile` drops, on every return path.
        let mut tmpfile = tempfile::NamedTempFile::new()?;
        tmpfile.write_all(pdf_bytes)?;
        let tmp_path = tmpfile.path().to_path_buf();

        let layout_text = run_pdftotext(&["-layout"], &tmp_path, deadline)?;
        let bbox_xml = run_pdftotext(&["-bbox-layout"], &tmp_path, deadline)?;
        let bbox_pages = parse_bbox_xml(&bbox_xml)?;

        // pdftotext uses form feed \x0c as page separator
        let texts: Vec<&str> = layout_text.split('\x0c').collect();

        let pages = bbox_pages
            .into_iter()
            .enumerate()
            .map(|(i, bp)| {
                let text = texts.get(i).copied().unwrap_or_default().to_string();
                Page::new(i, text, bp.tokens, bp.width, bp.height)
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            pages = pages.len(),
            tokens = pages.iter().map(|p| p.tokens.len()).sum::<usize>(),
            "pdftotext extraction complete"
        );
        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

impl ScanDetector for PdftotextExtractor {
    fn is_scanned(&self, pdf_bytes: &[u8], deadline: &Deadline) -> Result<bool, BidsheetError> {
        let mut tmpfile = tempfile::NamedTempFile::new()?;
        tmpfile.write_all(pdf_bytes)?;
        let text = run_pdftotext(&[], tmpfile.path(), deadline)?;
        let pages: Vec<Page> = text
            .split('\x0c')
            .enumerate()
            .map(|(i, t)| Page::new(i, t.to_string(), vec![], 0.0, 0.0))
            .collect();
        Ok(looks_scanned(&pages))
    }
}

fn run_pdftotext(args: &[&str], pdf_path: &Path, deadline: &Deadline) -> Result<String, BidsheetError> {
    let mut cmd = Command::new("pdftotext");
    cmd.args(args)
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-") // output to stdout
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BidsheetError::PdftotextNotFound
        } else {
            BidsheetError::UnexpectedDecoderFault(format!("pdftotext {:?} failed: {}", args, e))
        }
    })?;

    // Drain both pipes on their own threads so a large page set cannot
    // block the child on a full pipe while it is being polled.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_until(&mut child, deadline)
        .inspect_err(|e| tracing::warn!(args = ?args, error = %e, "pdftotext abandoned"))?;
    let stdout = join(stdout);
    let stderr = join(stderr);

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&stderr).to_string();
        return Err(BidsheetError::PdftotextFailed { code, stderr });
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

/// Wait for `child` to exit, killing it once `deadline` expires.
fn wait_until(child: &mut Child, deadline: &Deadline) -> Result<std::process::ExitStatus, BidsheetError> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if let Err(e) = deadline.check() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[derive(Debug, Default)]
struct BBoxPage {
    width: f32,
    height: f32,
    tokens: Vec<PositionedToken>,
}

#[derive(Debug)]
struct OpenWord {
    top: f32,
    bottom: f32,
    left: f32,
    text: String,
}

fn parse_bbox_xml(xml: &str) -> Result<Vec<BBoxPage>, BidsheetError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages: Vec<BBoxPage> = Vec::new();
    let mut word: Option<OpenWord> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => pages.push(BBoxPage {
                    width: attr_f32(&e, b"width").unwrap_or(0.0),
                    height: attr_f32(&e, b"height").unwrap_or(0.0),
                    tokens: Vec::new(),
                }),
                b"word" => {
                    word = Some(OpenWord {
                        top: attr_f32(&e, b"yMin").unwrap_or(0.0),
                        bottom: attr_f32(&e, b"yMax").unwrap_or(0.0),
                        left: attr_f32(&e, b"xMin").unwrap_or(0.0),
                        text: String::new(),
                    })
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(w) = word.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| BidsheetError::UnexpectedDecoderFault(format!("bbox text: {e}")))?;
                    w.text.push_str(&text);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"word" => {
                if let (Some(w), Some(page)) = (word.take(), pages.last_mut()) {
                    let text = w.text.trim();
                    if !text.is_empty() {
                        page.tokens
                            .push(PositionedToken::new(0, w.top, w.bottom, w.left, text));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BidsheetError::UnexpectedDecoderFault(format!(
                    "malformed bbox output at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(pages)
}

fn attr_f32(tag: &BytesStart<'_>, name: &[u8]) -> Option<f32> {
    tag.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok()?.parse().ok())
}
