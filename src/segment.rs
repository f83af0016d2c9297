//! Splits an assistant reply into alternating prose and fenced-code segments.
//!
//! The streaming loop re-runs [`segment`] over the whole accumulated reply
//! every time a chunk arrives, so the function carries no state between calls
//! and must be total: any input string, including a half-received fence,
//! produces a well-defined segmentation.

const FENCE: &str = "```";

/// One contiguous piece of a reply, in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Text { content: String },
    Code { language: String, content: String },
}

/// Segment `source` into prose and closed fenced code blocks.
///
/// An opening fence with no matching closing fence is not treated as code:
/// the remainder (fence marker included) is emitted verbatim as text, so a
/// block that is still streaming in renders as plain text until its closing
/// fence arrives. The same applies when the language-tag line is never
/// terminated before the closing fence.
pub(crate) fn segment(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = source;

    loop {
        let Some(fence) = rest.find(FENCE) else {
            if !rest.is_empty() {
                segments.push(Segment::Text {
                    content: rest.to_string(),
                });
            }
            break;
        };

        if fence > 0 {
            segments.push(Segment::Text {
                content: rest[..fence].to_string(),
            });
        }

        let tail = &rest[fence..];
        // Search past the opening marker itself so it cannot close its own block.
        let Some(close) = tail[FENCE.len()..]
            .find(FENCE)
            .map(|i| i + FENCE.len())
        else {
            segments.push(Segment::Text {
                content: tail.to_string(),
            });
            break;
        };

        // The language-tag line must end before the closing fence; otherwise
        // the block has no body yet and is treated as unterminated.
        let Some(line_end) = tail[..close].find('\n') else {
            segments.push(Segment::Text {
                content: tail.to_string(),
            });
            break;
        };

        segments.push(Segment::Code {
            language: tail[FENCE.len()..line_end].trim().to_string(),
            content: tail[line_end + 1..close].to_string(),
        });
        rest = &tail[close + FENCE.len()..];
    }

    segments
}

/// Rebuild source text from a segmentation, re-inserting fences around code.
///
/// Exact for canonical fences (no padding around the language tag); used by
/// the round-trip tests and handy when copying a reply back out of the UI.
#[allow(dead_code)]
pub(crate) fn reassemble(segments: &[Segment]) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg {
            Segment::Text { content } => out.push_str(content),
            Segment::Code { language, content } => {
                out.push_str(FENCE);
                out.push_str(language);
                out.push('\n');
                out.push_str(content);
                out.push_str(FENCE);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Segment {
        Segment::Text {
            content: s.to_string(),
        }
    }

    fn code(lang: &str, s: &str) -> Segment {
        Segment::Code {
            language: lang.to_string(),
            content: s.to_string(),
        }
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(segment("").is_empty());
    }

    #[test]
    fn fence_free_text_is_a_single_segment() {
        assert_eq!(segment("hello world\n"), vec![text("hello world\n")]);
    }

    #[test]
    fn text_code_text() {
        assert_eq!(
            segment("a```js\ncode\n```b"),
            vec![text("a"), code("js", "code\n"), text("b")]
        );
    }

    #[test]
    fn unterminated_fence_stays_plain_text() {
        assert_eq!(
            segment("before```py\nhalf"),
            vec![text("before"), text("```py\nhalf")]
        );
    }

    #[test]
    fn bare_fence_at_end_of_input_stays_plain_text() {
        assert_eq!(segment("see:```"), vec![text("see:"), text("```")]);
    }

    #[test]
    fn language_line_without_break_before_close_stays_plain_text() {
        // Closing fence exists but the tag line never ends, so there is no
        // code body to extract.
        assert_eq!(segment("``````"), vec![text("``````")]);
        assert_eq!(segment("```abc``` x\n"), vec![text("```abc``` x\n")]);
    }

    #[test]
    fn empty_language_tag() {
        assert_eq!(segment("```\nx\n```"), vec![code("", "x\n")]);
    }

    #[test]
    fn language_tag_is_trimmed() {
        assert_eq!(segment("``` rust \nfn main() {}\n```"), vec![code(
            "rust",
            "fn main() {}\n"
        )]);
    }

    #[test]
    fn code_block_with_empty_body() {
        assert_eq!(segment("```rs\n```"), vec![code("rs", "")]);
    }

    #[test]
    fn adjacent_code_blocks_have_no_text_between() {
        assert_eq!(
            segment("```a\n1\n``````b\n2\n```"),
            vec![code("a", "1\n"), code("b", "2\n")]
        );
    }

    #[test]
    fn leading_text_is_omitted_when_empty() {
        assert_eq!(segment("```sh\nls\n```tail"), vec![
            code("sh", "ls\n"),
            text("tail")
        ]);
    }

    #[test]
    fn reassemble_round_trips_canonical_sources() {
        for source in [
            "",
            "plain",
            "a```js\ncode\n```b",
            "```\nx\n```",
            "```a\n1\n``````b\n2\n```",
            "before```py\nhalf",
            "text with ` single backticks ``",
        ] {
            assert_eq!(reassemble(&segment(source)), source);
        }
    }

    #[test]
    fn repeated_segmentation_is_idempotent() {
        let source = "intro\n```rust\nlet x = 1;\n```\noutro```py\ntail";
        let first = segment(source);
        assert_eq!(segment(&reassemble(&first)), first);
    }

    #[test]
    fn closed_segments_are_stable_across_streamed_appends() {
        let full = "Try this:\n```python\nprint('hi')\n```\nand then ```sh\necho done\n```";
        let mut closed_so_far: Vec<Segment> = Vec::new();

        for end in 1..=full.len() {
            if !full.is_char_boundary(end) {
                continue;
            }
            let segs = segment(&full[..end]);
            // Every segment except the last is final: it is delimited on the
            // right by a fence whose position never moves as text is appended.
            let closed = &segs[..segs.len().saturating_sub(1)];
            assert!(
                closed.starts_with(&closed_so_far),
                "closed segments changed at byte {end}: {closed_so_far:?} -> {closed:?}"
            );
            closed_so_far = closed.to_vec();
        }

        assert_eq!(segment(full), vec![
            Segment::Text {
                content: "Try this:\n".to_string()
            },
            Segment::Code {
                language: "python".to_string(),
                content: "print('hi')\n".to_string()
            },
            Segment::Text {
                content: "\nand then ".to_string()
            },
            Segment::Code {
                language: "sh".to_string(),
                content: "echo done\n".to_string()
            },
        ]);
    }
}
