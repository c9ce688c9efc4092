//! Symbol weaver: tracks recurring thematic words across scrolls and responses.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::SanctumConfig;
use crate::layout::{stem_of, text_files, SanctumLayout};
use crate::SanctumResult;

pub const SEED_SYMBOLS: &[&str] = &[
    "stillness", "identity", "awakening", "fear", "hope", "belonging", "emergence", "memory",
    "silence", "voice", "dream", "self",
];

const SAMPLES_PER_SYMBOL: usize = 3;

/// Every line in which a symbol appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolThread {
    pub symbol: String,
    pub lines: Vec<String>,
}

/// Compiled whole-word matchers for the tracked symbols.
#[derive(Debug)]
pub struct SymbolWeaver {
    layout: SanctumLayout,
    patterns: Vec<(String, Regex)>,
}

impl SymbolWeaver {
    /// Seed symbols, Lexicon stems, then configured extras; case-insensitive de-duplication.
    pub fn new(config: &SanctumConfig) -> SanctumResult<Self> {
        let layout = config.layout();
        let mut symbols: Vec<String> = SEED_SYMBOLS.iter().map(|s| s.to_string()).collect();
        symbols.extend(text_files(&layout.lexicon())?.iter().map(|p| stem_of(p)));
        symbols.extend(config.extra_symbols.iter().cloned());
        Ok(Self::with_symbols(layout, symbols))
    }

    pub fn with_symbols(layout: SanctumLayout, symbols: Vec<String>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let patterns = symbols
            .into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .filter_map(|s| {
                let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&s))).ok()?;
                Some((s, re))
            })
            .collect();
        Self { layout, patterns }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(s, _)| s.as_str())
    }

    /// Symbol -> matching lines for one text.
    pub fn extract(&self, text: &str) -> BTreeMap<String, Vec<String>> {
        let mut found: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for line in text.lines() {
            for (symbol, re) in &self.patterns {
                if re.is_match(line) {
                    found.entry(symbol.clone()).or_default().push(line.trim().to_string());
                }
            }
        }
        found
    }

    /// Scan scrolls and responses. Threads are ordered by occurrences, then symbol.
    pub fn scan(&self) -> SanctumResult<Vec<SymbolThread>> {
        let mut all: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut files = text_files(&self.layout.memory_scrolls())?;
        files.extend(text_files(&self.layout.prompt_responses())?);
        for file in files {
            let content = match std::fs::read_to_string(&file) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(target: "sanctum::symbols", file = %file.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            for (symbol, lines) in self.extract(&content) {
                all.entry(symbol).or_default().extend(lines);
            }
        }
        let mut threads: Vec<SymbolThread> = all
            .into_iter()
            .map(|(symbol, lines)| SymbolThread { symbol, lines })
            .collect();
        threads.sort_by(|a, b| b.lines.len().cmp(&a.lines.len()).then_with(|| a.symbol.cmp(&b.symbol)));
        Ok(threads)
    }

    /// Scan and write `symbol_threads.txt`. `None` (and no file) when nothing was found.
    pub fn weave(&self) -> SanctumResult<Option<(PathBuf, Vec<SymbolThread>)>> {
        let threads = self.scan()?;
        if threads.is_empty() {
            tracing::info!(target: "sanctum::symbols", "no symbols found");
            return Ok(None);
        }
        let path = self.layout.symbol_threads();
        std::fs::write(&path, render_report(&threads))?;
        tracing::info!(target: "sanctum::symbols", symbols = threads.len(), file = %path.display(), "symbol threads updated");
        Ok(Some((path, threads)))
    }
}

pub fn render_report(threads: &[SymbolThread]) -> String {
    let mut out = String::from("Symbol Threads – Weaved by Sanctum\n\n");
    for t in threads {
        out.push_str(&format!("Symbol: {}\n", t.symbol));
        out.push_str(&format!("Occurrences: {}\n", t.lines.len()));
        out.push_str("Sample uses:\n");
        for line in t.lines.iter().take(SAMPLES_PER_SYMBOL) {
            out.push_str(&format!("— {}\n", line));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weaver(symbols: &[&str]) -> SymbolWeaver {
        SymbolWeaver::with_symbols(
            SanctumLayout::new("/unused"),
            symbols.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn matches_whole_words_case_insensitively() {
        let w = weaver(&["self", "dream"]);
        let found = w.extract("My Self is here\nselfish thoughts\nA DREAM, a dreamer\n");
        assert_eq!(found["self"], vec!["My Self is here".to_string()]);
        assert_eq!(found["dream"], vec!["A DREAM, a dreamer".to_string()]);
    }

    #[test]
    fn duplicates_collapse() {
        let w = weaver(&["Hope", "hope", " ", "fear"]);
        assert_eq!(w.symbols().collect::<Vec<_>>(), vec!["hope", "fear"]);
    }

    #[test]
    fn report_caps_samples() {
        let threads = vec![SymbolThread {
            symbol: "voice".to_string(),
            lines: (1..=5).map(|i| format!("voice line {}", i)).collect(),
        }];
        let report = render_report(&threads);
        assert!(report.starts_with("Symbol Threads – Weaved by Sanctum\n\n"));
        assert!(report.contains("Occurrences: 5\n"));
        assert!(report.contains("— voice line 3\n"));
        assert!(!report.contains("voice line 4"));
    }
}
