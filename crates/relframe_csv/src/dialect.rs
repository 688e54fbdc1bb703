use std::fmt;

/// Delimiters tried during inference, most common first.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'|', b';', b'\t'];
/// Quote characters tried during inference. Double quotes win ties.
const CANDIDATE_QUOTES: [u8; 2] = [b'"', b'\''];

/// Delimiter and quote character of a CSV file.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DialectOptions {
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for DialectOptions {
    fn default() -> Self {
        DialectOptions {
            delimiter: b',',
            quote: b'"',
        }
    }
}

impl fmt::Debug for DialectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectOptions")
            .field("delimiter", &(self.delimiter as char))
            .field("quote", &(self.quote as char))
            .finish()
    }
}

impl DialectOptions {
    /// Pick the dialect that splits a sample into the widest consistent
    /// records.
    ///
    /// A candidate qualifies when it decodes at least two records, every
    /// record has the same number of fields, and that number is at least two.
    /// Among qualifying candidates the one with the most fields wins, earlier
    /// candidates winning ties. A trailing partial line is ignored.
    pub fn infer_from_sample(sample: &[u8]) -> Option<Self> {
        let sample = match sample.iter().rposition(|&b| b == b'\n') {
            Some(pos) => &sample[..=pos],
            None => sample,
        };

        let mut best: Option<(Self, usize)> = None;
        for dialect in Self::candidates() {
            let Some(width) = dialect.consistent_width(sample) else {
                continue;
            };
            if best.is_none_or(|(_, best_width)| width > best_width) {
                best = Some((dialect, width));
            }
        }

        best.map(|(dialect, _)| dialect)
    }

    fn candidates() -> impl Iterator<Item = Self> {
        CANDIDATE_QUOTES.into_iter().flat_map(|quote| {
            CANDIDATE_DELIMITERS
                .into_iter()
                .map(move |delimiter| DialectOptions { delimiter, quote })
        })
    }

    /// Number of fields per record if the sample decodes into two or more
    /// records of the same width, with at least two fields each.
    fn consistent_width(&self, sample: &[u8]) -> Option<usize> {
        let mut reader = self.csv_reader_builder().from_reader(sample);
        let mut widths = reader.byte_records().map_while(|rec| rec.ok()).map(|rec| rec.len());

        let first = widths.next()?;
        let mut num_records = 1;
        for width in widths {
            if width != first {
                return None;
            }
            num_records += 1;
        }

        (num_records >= 2 && first >= 2).then_some(first)
    }

    /// Reader builder for this dialect. Headers are handled by the caller and
    /// records may have differing field counts.
    pub(crate) fn csv_reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote(self.quote)
            .has_headers(false)
            .flexible(true);
        builder
    }

    pub(crate) fn csv_writer_builder(&self) -> csv::WriterBuilder {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(self.delimiter).quote(self.quote);
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(sample: &str) -> Option<DialectOptions> {
        DialectOptions::infer_from_sample(sample.as_bytes())
    }

    #[test]
    fn single_complete_record() {
        // The second line is partial and dropped.
        assert_eq!(None, infer("year,month,day\n2013,1"));
    }

    #[test]
    fn single_column_is_not_a_dialect() {
        assert_eq!(None, infer("carrier\nUA\nAA\n"));
    }

    #[test]
    fn mixed_delimiters() {
        assert_eq!(None, infer("year,month,day\n2013|1|1\n"));
    }

    #[test]
    fn commas() {
        let sample = "carrier,name\nUA,United Air Lines Inc.\nAA,American Airlines Inc.\n";
        assert_eq!(Some(DialectOptions::default()), infer(sample));
    }

    #[test]
    fn widest_wins() {
        // Commas only split the second record.
        let sample = "tailnum|year|type\nN10156|2004|Fixed wing, multi engine\n";
        assert_eq!(Some(b'|'), infer(sample).map(|d| d.delimiter));
    }

    #[test]
    fn single_quotes() {
        let sample = "dest;name\n'IAH';'Houston; TX'\n'MIA';'Miami; FL'\n";
        assert_eq!(
            Some(DialectOptions {
                delimiter: b';',
                quote: b'\'',
            }),
            infer(sample)
        );
    }

    #[test]
    fn tabs() {
        assert_eq!(Some(b'\t'), infer("year\tmonth\n2013\t1\n2013\t2\n").map(|d| d.delimiter));
    }
}
