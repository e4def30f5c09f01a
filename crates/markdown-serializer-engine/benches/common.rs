// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_note(sections: usize) -> String {
    let mut content = String::new();

    for section in 0..sections {
        content.push_str(&format!("# Section {section}\n\n"));
        content.push_str("Some paragraph content with multiple sentences. Status: ");
        content.push_str(&format!("<!-- IQ: =this.status{section} -->\n\n"));
        content.push_str(&format!(
            "<!-- QueryToSerialize: LIST FROM #tag{section} SORT file.name -->\n\n"
        ));
        content.push_str("- Bullet point\n  - Nested item\n\n");
        content.push_str(&format!(
            "> <!-- dataview-serializer-query-once: TABLE file.mtime FROM \"folder{section}\" -->\n\n"
        ));
        content.push_str("| a | <!-- IQ: =this.cell --> |\n|---|---|\n\n");
    }

    content
}

#[allow(dead_code)]
pub fn generate_raw_note(sections: usize) -> String {
    let mut content = String::new();

    for section in 0..sections {
        content.push_str(&format!(
            "# Section {section}\n\nValue `= this.v{section}` here.\n\n```dataview\nLIST\nFROM #tag{section}\n```\n\n```rust\nfn main() {{}}\n```\n\n"
        ));
    }

    content
}

#[allow(dead_code)]
pub fn rendered_list(items: usize) -> String {
    (0..items)
        .map(|i| format!("- [[Note {i}]]"))
        .collect::<Vec<_>>()
        .join("\n")
}
