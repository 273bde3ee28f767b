// Integration tests for the trace rewriter

use addrindex::rewrite::{Rewriter, Rewritten};
use addrindex::trace::TraceError;
use std::io::Cursor;

fn rewrite(input: &str) -> (String, Result<addrindex::rewrite::RewriteSummary, TraceError>) {
    let mut output = Vec::new();
    let mut rewriter = Rewriter::new();
    let result = rewriter.run(Cursor::new(input), &mut output);
    (String::from_utf8(output).expect("output is UTF-8"), result)
}

#[test]
fn test_basic_trace() {
    let input = "\
malloc 56 -> 0x7fc49a500c00
free 0x7fc49a500c00
malloc 24 -> 0x7fc49a500c40
free 0x7fc49a500c40
";
    let (output, result) = rewrite(input);
    let summary = result.expect("rewrite failed");

    assert_eq!(
        output,
        "malloc 56 -> 0\nfree 0\nmalloc 24 -> 1\nfree 1\n"
    );
    assert_eq!(summary.lines_read, 4);
    assert_eq!(summary.lines_rewritten, 4);
    assert_eq!(summary.unmatched_frees, 0);
    assert!(!summary.halted);
}

#[test]
fn test_refree_of_mapped_address_is_rewritten() {
    // Bindings persist after a free, so a second free still resolves
    let input = "\
malloc 56 -> 0x7fc49a500c00
free 0x7fc49a500c00
malloc 24 -> 0x7fc49a500c40
free 0x7fc49a500c40
free 0x7fc49a500c00
";
    let (output, result) = rewrite(input);
    result.expect("rewrite failed");

    assert_eq!(
        output,
        "malloc 56 -> 0\nfree 0\nmalloc 24 -> 1\nfree 1\nfree 0\n"
    );
}

#[test]
fn test_unmatched_free_is_commented() {
    let input = "\
free 0x7fc49a500c00
malloc 8 -> 0x7fc49a500c40
free 0x7fc49a999999
";
    let (output, result) = rewrite(input);
    let summary = result.expect("rewrite failed");

    assert_eq!(
        output,
        "# free 0x7fc49a500c00\nmalloc 8 -> 0\n# free 0x7fc49a999999\n"
    );
    assert_eq!(summary.unmatched_frees, 2);
    assert_eq!(summary.lines_rewritten, 1);
}

#[test]
fn test_unmatched_free_does_not_consume_an_index() {
    let input = "free 0xaaa\nmalloc 8 -> 0xaaa\n";
    let (output, result) = rewrite(input);
    result.expect("rewrite failed");

    assert_eq!(output, "# free 0xaaa\nmalloc 8 -> 0\n");
}

#[test]
fn test_reused_address_keeps_its_index() {
    let input = "\
malloc 16 -> 0xa
malloc 16 -> 0xb
free 0xa
malloc 32 -> 0xa
malloc 16 -> 0xc
";
    let (output, result) = rewrite(input);
    result.expect("rewrite failed");

    assert_eq!(
        output,
        "malloc 16 -> 0\nmalloc 16 -> 1\nfree 0\nmalloc 32 -> 0\nmalloc 16 -> 2\n"
    );
}

#[test]
fn test_indices_follow_first_seen_order() {
    let addresses = ["0x30", "0x10", "0x30", "0x20", "0x10", "0x40", "0x20"];
    let input: String = addresses
        .iter()
        .map(|a| format!("malloc 1 -> {}\n", a))
        .collect();

    let mut rewriter = Rewriter::new();
    let mut output = Vec::new();
    rewriter
        .run(Cursor::new(input), &mut output)
        .expect("rewrite failed");

    let indices: Vec<usize> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| l.rsplit(' ').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(indices, vec![0, 1, 0, 2, 1, 3, 2]);

    // Each index equals the number of distinct addresses seen before it
    let mut seen: Vec<&str> = Vec::new();
    for (&address, &index) in addresses.iter().zip(&indices) {
        match seen.iter().position(|&s| s == address) {
            Some(pos) => assert_eq!(index, pos),
            None => {
                assert_eq!(index, seen.len());
                seen.push(address);
            }
        }
    }

    let table: Vec<_> = rewriter.table().entries().collect();
    assert_eq!(
        table,
        vec![("0x30", 0), ("0x10", 1), ("0x20", 2), ("0x40", 3)]
    );
}

#[test]
fn test_empty_input() {
    let (output, result) = rewrite("");
    let summary = result.expect("rewrite failed");

    assert!(output.is_empty());
    assert_eq!(summary.lines_read, 0);
}

#[test]
fn test_blank_line_halts() {
    let input = "\
malloc 8 -> 0xa

malloc 8 -> 0xb
free 0xa
";
    let (output, result) = rewrite(input);
    let summary = result.expect("rewrite failed");

    assert_eq!(output, "malloc 8 -> 0\n");
    assert!(summary.halted);
    assert_eq!(summary.lines_read, 2);
}

#[test]
fn test_whitespace_only_line_halts() {
    let (output, result) = rewrite("malloc 8 -> 0xa\n   \t\nfree 0xa\n");
    assert!(result.expect("rewrite failed").halted);
    assert_eq!(output, "malloc 8 -> 0\n");
}

#[test]
fn test_surrounding_whitespace_is_trimmed() {
    let (output, result) = rewrite("  malloc 8 -> 0xa  \r\nfree 0xa\t\n");
    result.expect("rewrite failed");
    assert_eq!(output, "malloc 8 -> 0\nfree 0\n");
}

#[test]
fn test_invalid_utf8_is_tolerated() {
    let input: &[u8] = b"malloc 8 -> 0x\xff10\nfree 0x\xff10\nfree 0x\xfe20\n";
    let mut output = Vec::new();
    let summary = Rewriter::new()
        .run(Cursor::new(input), &mut output)
        .expect("rewrite failed");

    assert_eq!(summary.lines_read, 3);
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "malloc 8 -> 0\nfree 0\n# free 0x\u{fffd}20\n"
    );
}

#[test]
fn test_short_malloc_is_fatal() {
    let input = "malloc 8 -> 0xa\nmalloc 8\nfree 0xa\n";
    let (output, result) = rewrite(input);

    match result {
        Err(TraceError::MissingField {
            position, tokens, line, ..
        }) => {
            assert_eq!(position, 3);
            assert_eq!(tokens, 2);
            assert_eq!(line, 2);
        }
        other => panic!("expected MissingField, got {:?}", other),
    }
    // Lines before the failure were flushed
    assert_eq!(output, "malloc 8 -> 0\n");
}

#[test]
fn test_short_free_is_fatal() {
    let (_, result) = rewrite("free\n");
    let err = result.expect_err("bare free should fail");
    assert_eq!(err.line(), Some(1));
    assert!(err.to_string().contains("line 1"));
}

#[test]
fn test_rewrite_line_directly() {
    let mut rewriter = Rewriter::new();

    assert_eq!(
        rewriter.rewrite_line("malloc 56 -> 0x7fc49a404b80").unwrap(),
        Rewritten::Line("malloc 56 -> 0".to_string())
    );
    assert_eq!(
        rewriter.rewrite_line("free 0x7fc49a404b80").unwrap(),
        Rewritten::Line("free 0".to_string())
    );
    assert_eq!(
        rewriter.rewrite_line("free 0x1").unwrap(),
        Rewritten::Comment("# free 0x1".to_string())
    );
    assert_eq!(rewriter.rewrite_line("").unwrap(), Rewritten::Halt);
}
