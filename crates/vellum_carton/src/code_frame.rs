//! Code frames for diagnostics.

const RANGE: isize = 2;

/// Render `source` around the byte range `start..end` with line numbers and a
/// caret underline, two lines of context on each side.
pub fn generate_code_frame(source: &str, start: usize, end: usize) -> String {
    let lines: Vec<&str> = source
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let start = start as isize;
    let end = end.min(source.len()) as isize;
    let mut count: isize = 0;
    let mut res: Vec<String> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        count += line.len() as isize + 1;
        if count < start {
            continue;
        }
        let i = i as isize;
        let mut j = i - RANGE;
        while j <= i + RANGE || end > count {
            if j < 0 || j >= lines.len() as isize {
                if j >= lines.len() as isize {
                    break;
                }
                j += 1;
                continue;
            }
            let text = lines[j as usize];
            let line_no = (j + 1).to_string();
            let gutter = " ".repeat(3usize.saturating_sub(line_no.len()));
            res.push(format!("{line_no}{gutter}|  {text}"));
            let line_len = text.len() as isize;
            if j == i {
                let pad = start - (count - line_len) + 1;
                let len = if end > count {
                    line_len - pad
                } else {
                    end - start
                }
                .max(1);
                res.push(format!(
                    "   |  {}{}",
                    " ".repeat(pad.max(0) as usize),
                    "^".repeat(len as usize)
                ));
            } else if j > i {
                if end > count {
                    let len = (end - count).min(line_len).max(1);
                    res.push(format!("   |  {}", "^".repeat(len as usize)));
                }
                count += line_len + 1;
            }
            j += 1;
        }
        break;
    }

    res.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_frame() {
        let source = "<div>\n  <span>hi</span>\n</div>";
        let start = source.find("<span>").unwrap();
        let frame = generate_code_frame(source, start, start + 6);
        assert_eq!(
            frame,
            "1  |  <div>\n2  |    <span>hi</span>\n   |    ^^^^^^\n3  |  </div>"
        );
    }

    #[test]
    fn test_multi_line_frame() {
        let source = "a\nbb\nccc";
        let frame = generate_code_frame(source, 2, 7);
        assert!(frame.contains("2  |  bb"));
        assert!(frame.contains("3  |  ccc"));
        assert!(frame.lines().filter(|l| l.contains('^')).count() >= 2);
    }
}
