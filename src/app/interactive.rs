//! Terminal prompts shared by the binaries. Reader and writer are injected so tests can script them.

use crate::core::images::clean_path;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Prints `question`, reads one line. `None` on end of input.
pub fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> io::Result<Option<String>> {
    write!(out, "{}", question)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// y/yes is consent; anything else, including end of input, is not.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> io::Result<bool> {
    let answer = ask(input, out, &format!("{} (y/n): ", question))?;
    Ok(matches!(
        answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("y") | Some("yes")
    ))
}

fn display(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_quit(choice: &str) -> bool {
    matches!(choice.to_ascii_lowercase().as_str(), "qq" | "q" | "exit")
}

/// Numbered picker over `recent`: a number adds that image, `0` asks for a path,
/// a bare path is taken as-is, `ff` finishes, `qq` quits.
/// Returns `None` when the user quits.
pub fn select_images<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    recent: &[PathBuf],
) -> io::Result<Option<Vec<String>>> {
    let mut selected: Vec<String> = Vec::new();

    if recent.is_empty() {
        writeln!(out, "📁 No recent images found. Enter file paths.")?;
    } else {
        writeln!(out, "Recent image files found:")?;
        for (i, path) in recent.iter().enumerate() {
            writeln!(out, "   {:2}. {}", i + 1, display(path))?;
        }
        writeln!(out, "    0. Add custom file path")?;
    }
    writeln!(out, "   ff. Done selecting images")?;
    writeln!(out, "   qq. Quit")?;

    loop {
        writeln!(out, "Currently selected: {} image(s)", selected.len())?;
        let Some(choice) = ask(input, out, "Choose image number, enter a file path, ff to finish, or qq to quit: ")? else {
            return Ok(None);
        };

        if is_quit(&choice) {
            return Ok(None);
        }
        if choice.is_empty() {
            writeln!(out, "❌ Please provide a selection")?;
            continue;
        }
        if choice.eq_ignore_ascii_case("ff") {
            if selected.is_empty() {
                writeln!(out, "❌ Please select at least 1 image")?;
                continue;
            }
            return Ok(Some(selected));
        }

        let candidate = if choice == "0" {
            match ask(input, out, "📁 Enter file path: ")? {
                Some(path) => clean_path(&path),
                None => return Ok(None),
            }
        } else if let Ok(n) = choice.parse::<usize>() {
            match recent.get(n.wrapping_sub(1)) {
                Some(path) => path.display().to_string(),
                None => {
                    writeln!(out, "❌ Invalid choice. Enter 1-{}, 0, ff, or a file path", recent.len())?;
                    continue;
                }
            }
        } else {
            clean_path(&choice)
        };

        if candidate.is_empty() || !Path::new(&candidate).exists() {
            writeln!(out, "❌ File not found: {}", candidate)?;
        } else if selected.contains(&candidate) {
            writeln!(out, "⚠️ Image already selected")?;
        } else {
            writeln!(out, "✅ Added: {}", display(Path::new(&candidate)))?;
            selected.push(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn run(script: &str, recent: &[PathBuf]) -> (Option<Vec<String>>, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        let result = select_images(&mut input, &mut out, recent).unwrap();
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_pick_by_number_and_custom_path() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let script = format!("ff\n1\n1\n0\n'{}'\n9\nff\n", b.display());
        let (selected, transcript) = run(&script, &[a.clone()]);

        assert_eq!(
            selected,
            Some(vec![a.display().to_string(), b.display().to_string()])
        );
        assert!(transcript.contains("Please select at least 1 image"));
        assert!(transcript.contains("Image already selected"));
        assert!(transcript.contains("Invalid choice"));
    }

    #[test]
    fn test_quit_and_end_of_input() {
        assert_eq!(run("qq\n", &[]).0, None);
        assert_eq!(run("", &[]).0, None);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let (selected, transcript) = run("/nope/missing.png\nqq\n", &[]);
        assert!(selected.is_none());
        assert!(transcript.contains("File not found: /nope/missing.png"));
    }

    #[test]
    fn test_confirm() {
        let mut out = Vec::new();
        assert!(confirm(&mut Cursor::new(b"Y\n".to_vec()), &mut out, "Update?").unwrap());
        assert!(!confirm(&mut Cursor::new(b"n\n".to_vec()), &mut out, "Update?").unwrap());
        assert!(!confirm(&mut Cursor::new(Vec::new()), &mut out, "Update?").unwrap());
    }
}
