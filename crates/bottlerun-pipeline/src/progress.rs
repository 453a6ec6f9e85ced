/// Longest token accepted for the size/rate fields. Worker tools sometimes
/// flush several buffered screen lines as one, and anything longer than
/// this is assumed to be such garbage rather than a real token.
pub const TOKEN_MAX_LEN: usize = 10;

const PERCENT_DIGITS_MAX: usize = 3;
const TOTAL_SIZE_MARKER: &str = "Length:";

/// Snapshot of parsed progress at a point in time. Fields are sticky:
/// each is updated independently when its token appears in a line and
/// keeps its previous value otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSample {
    pub percent: Option<u8>,
    pub current: Option<String>,
    pub total: Option<String>,
    pub rate: Option<String>,
    pub eta: Option<String>,
}

impl ProgressSample {
    pub fn is_complete(&self) -> bool {
        self.percent == Some(100)
    }
}

/// Folds one line of worker output into `previous`, returning the updated
/// sample. Pure: a line matching no rule returns `previous` unchanged, and
/// a token failing its guard is ignored for that field only.
///
/// The permissive-ignore policy is required by the input: download tools
/// emit ANSI- and carriage-return-laden text, and rejecting whole lines
/// would abort the display instead of degrading it.
///
/// Percent is deliberately not forced monotonic; a later line with a
/// smaller value overwrites the sample (a worker may restart a
/// sub-transfer).
pub fn apply_line(line: &str, previous: &ProgressSample) -> ProgressSample {
    let mut sample = previous.clone();

    apply_total_size(line, &mut sample);

    if let Some(found) = find_percent(line) {
        sample.percent = Some(found.value);
        apply_current_amount(&line[..found.digits_start], &mut sample);
        apply_rate(&line[found.marker_end..], &mut sample);
        apply_eta(line, &mut sample);
    }

    sample
}

struct PercentMatch {
    digits_start: usize,
    marker_end: usize,
    value: u8,
}

/// First `<1-3 digits>%` occurrence with a value in range. An overlong
/// digit run or a value above 100 disqualifies that occurrence only.
fn find_percent(line: &str) -> Option<PercentMatch> {
    let bytes = line.as_bytes();
    for (idx, &byte) in bytes.iter().enumerate() {
        if byte != b'%' {
            continue;
        }
        let mut start = idx;
        while start > 0 && bytes[start - 1].is_ascii_digit() {
            start -= 1;
        }
        let digits = idx - start;
        if digits == 0 || digits > PERCENT_DIGITS_MAX {
            continue;
        }
        let Ok(value) = line[start..idx].parse::<u32>() else {
            continue;
        };
        if value > 100 {
            continue;
        }
        return Some(PercentMatch {
            digits_start: start,
            marker_end: idx + 1,
            value: value as u8,
        });
    }
    None
}

/// `Length: 52428800 (50M) [application/zip]` carries the human-readable
/// total in parentheses.
fn apply_total_size(line: &str, sample: &mut ProgressSample) {
    let Some(rest) = line.trim_start().strip_prefix(TOTAL_SIZE_MARKER) else {
        return;
    };
    let Some(open) = rest.find('(') else {
        return;
    };
    let Some(close) = rest[open..].find(')') else {
        return;
    };
    let token = rest[open + 1..open + close].trim();
    if !token.is_empty() && token.len() <= TOKEN_MAX_LEN {
        sample.total = Some(token.to_string());
    }
}

/// The amount transferred so far sits just before the percent marker,
/// padded with wget's dot columns.
fn apply_current_amount(before_marker: &str, sample: &mut ProgressSample) {
    let trimmed = before_marker.trim_end_matches(|c: char| c == '.' || c.is_whitespace());
    let Some(token) = trimmed.split_whitespace().next_back() else {
        return;
    };
    if !token.is_empty() && token.len() <= TOKEN_MAX_LEN {
        sample.current = Some(token.to_string());
    }
}

fn apply_rate(after_marker: &str, sample: &mut ProgressSample) {
    let trimmed = after_marker.trim_start_matches(|c: char| c == '.' || c.is_whitespace());
    let Some(token) = trimmed.split_whitespace().next() else {
        return;
    };
    if token.len() <= TOKEN_MAX_LEN {
        sample.rate = Some(token.to_string());
    }
}

/// The estimated time remaining is the trailing alphanumeric run of the
/// line. Only consulted on percent-bearing lines; on arbitrary lines the
/// trailing word is almost never an eta.
fn apply_eta(line: &str, sample: &mut ProgressSample) {
    let run: String = line
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if !run.is_empty() {
        sample.eta = Some(run);
    }
}
