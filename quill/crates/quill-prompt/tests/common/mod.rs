//! Replays raw VT100 output onto a character grid.
//!
//! Tests look at what a terminal would have displayed rather than at the
//! escape sequences the renderer chose to get there.

#![allow(dead_code)]

/// Every screen shown before an erase-down, followed by the final screen.
/// Rows have trailing blanks trimmed.
pub fn screens(raw: &str, columns: usize) -> Vec<Vec<String>> {
    let mut term = Grid::new(columns);
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\x1b' => match chars.next() {
                Some('[') => {
                    let mut params = String::new();
                    let mut last = None;
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            last = Some(c);
                            break;
                        }
                        params.push(c);
                    }
                    if let Some(command) = last {
                        term.csi(&params, command);
                    }
                }
                Some(']') => {
                    // OSC, terminated by BEL or ST.
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\r' => term.x = 0,
            '\n' => term.y += 1,
            '\x08' => term.x = term.x.saturating_sub(1),
            c if c >= ' ' => term.put(c),
            _ => {}
        }
    }
    term.shown.push(term.rows());
    term.shown
}

/// The last screen.
pub fn final_screen(raw: &str, columns: usize) -> Vec<String> {
    screens(raw, columns).pop().unwrap_or_default()
}

/// Whether any shown screen has a row containing `needle`.
pub fn was_shown(raw: &str, columns: usize, needle: &str) -> bool {
    screens(raw, columns)
        .iter()
        .flatten()
        .any(|row| row.contains(needle))
}

struct Grid {
    columns: usize,
    cells: Vec<Vec<char>>,
    x: usize,
    y: usize,
    shown: Vec<Vec<String>>,
}

impl Grid {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            cells: Vec::new(),
            x: 0,
            y: 0,
            shown: Vec::new(),
        }
    }

    fn row_mut(&mut self, y: usize) -> &mut Vec<char> {
        while self.cells.len() <= y {
            self.cells.push(vec![' '; self.columns]);
        }
        &mut self.cells[y]
    }

    fn put(&mut self, c: char) {
        let (x, y) = (self.x.min(self.columns - 1), self.y);
        self.row_mut(y)[x] = c;
        // Autowrap is off: the cursor stays in the last column.
        self.x = (self.x + 1).min(self.columns - 1);
    }

    fn rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect()
    }

    fn csi(&mut self, params: &str, command: char) {
        if params.starts_with('?') || params.ends_with(' ') {
            return;
        }
        let mut numbers = params.split(';').map(|p| p.parse::<usize>().ok());
        let first = numbers.next().flatten();
        let n = first.unwrap_or(1).max(1);
        match command {
            'A' => self.y = self.y.saturating_sub(n),
            'B' => self.y += n,
            'C' => self.x = (self.x + n).min(self.columns - 1),
            'D' => self.x = self.x.saturating_sub(n),
            'H' => {
                self.y = first.unwrap_or(1).saturating_sub(1);
                self.x = numbers.next().flatten().unwrap_or(1).saturating_sub(1);
            }
            'K' => {
                let (x, y) = (self.x, self.y);
                self.row_mut(y)[x..].fill(' ');
            }
            'J' => {
                self.shown.push(self.rows());
                if first == Some(2) {
                    self.cells.clear();
                } else {
                    let (x, y) = (self.x, self.y);
                    self.row_mut(y)[x..].fill(' ');
                    self.cells.truncate(y + 1);
                }
            }
            _ => {}
        }
    }
}
