//! Filter descriptions and their canonical filtergraph text.
//!
//! Rendering never escapes: option values are emitted exactly as given, so
//! callers quote filtergraph-special characters themselves the way ffmpeg
//! expects.

use std::fmt;

/// Filter options as ffmpeg accepts them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOptions {
    /// Emitted verbatim after `=`.
    Verbatim(String),
    /// Positional values joined with `:`.
    Ordered(Vec<String>),
    /// `key=value` pairs in insertion order, joined with `:`.
    Named(Vec<(String, String)>),
}

impl FilterOptions {
    fn is_empty(&self) -> bool {
        match self {
            FilterOptions::Verbatim(text) => text.is_empty(),
            FilterOptions::Ordered(values) => values.is_empty(),
            FilterOptions::Named(pairs) => pairs.is_empty(),
        }
    }
}

impl fmt::Display for FilterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOptions::Verbatim(text) => f.write_str(text),
            FilterOptions::Ordered(values) => f.write_str(&values.join(":")),
            FilterOptions::Named(pairs) => {
                let joined: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                f.write_str(&joined.join(":"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub filter: String,
    pub options: Option<FilterOptions>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl FilterSpec {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            options: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn verbatim(mut self, options: impl Into<String>) -> Self {
        self.options = Some(FilterOptions::Verbatim(options.into()));
        self
    }

    pub fn ordered<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(FilterOptions::Ordered(
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn named<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.options = Some(FilterOptions::Named(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ));
        self
    }

    pub fn input(mut self, label: impl Into<String>) -> Self {
        self.inputs.push(label.into());
        self
    }

    pub fn inputs<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn output(mut self, label: impl Into<String>) -> Self {
        self.outputs.push(label.into());
        self
    }

    pub fn outputs<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.extend(labels.into_iter().map(Into::into));
        self
    }

    /// `[in1][in2]name=options[out1]`
    pub fn render(&self) -> String {
        let mut text = String::new();
        for label in &self.inputs {
            push_label(&mut text, label);
        }
        text.push_str(&self.filter);
        if let Some(options) = self.options.as_ref().filter(|options| !options.is_empty()) {
            text.push('=');
            text.push_str(&options.to_string());
        }
        for label in &self.outputs {
            push_label(&mut text, label);
        }
        text
    }
}

impl From<&str> for FilterSpec {
    fn from(filter: &str) -> Self {
        FilterSpec::new(filter)
    }
}

impl From<String> for FilterSpec {
    fn from(filter: String) -> Self {
        FilterSpec::new(filter)
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn push_label(text: &mut String, label: &str) {
    text.push('[');
    text.push_str(label.trim_start_matches('[').trim_end_matches(']'));
    text.push(']');
}

/// A complex filtergraph: filters inside a chain are joined with `,`, chains
/// with `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterGraph {
    chains: Vec<Vec<FilterSpec>>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain<I, F>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FilterSpec>,
    {
        let chain: Vec<FilterSpec> = filters.into_iter().map(Into::into).collect();
        if !chain.is_empty() {
            self.chains.push(chain);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn render(&self) -> String {
        self.chains
            .iter()
            .map(|chain| render_chain(chain))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl<F: Into<FilterSpec>> FromIterator<F> for FilterGraph {
    /// Each filter becomes its own chain.
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        iter.into_iter()
            .fold(FilterGraph::new(), |graph, filter| graph.chain([filter]))
    }
}

/// Filters of a simple `-filter:a` / `-filter:v` chain.
pub fn render_chain(filters: &[FilterSpec]) -> String {
    filters
        .iter()
        .map(FilterSpec::render)
        .collect::<Vec<_>>()
        .join(",")
}

/// `out` and `[out]` both become `[out]`.
pub fn bracket_label(label: &str) -> String {
    let mut text = String::with_capacity(label.len() + 2);
    push_label(&mut text, label);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_labels_around_name() {
        let spec = FilterSpec::new("overlay")
            .inputs(["0:v", "1:v"])
            .output("out");
        assert_eq!(spec.render(), "[0:v][1:v]overlay[out]");
    }

    #[test]
    fn named_options_keep_insertion_order() {
        let spec = FilterSpec::new("pad").named([("w", "iw*3"), ("h", "ih")]);
        assert_eq!(spec.render(), "pad=w=iw*3:h=ih");
    }

    #[test]
    fn ordered_and_verbatim_options() {
        assert_eq!(
            FilterSpec::new("scale").ordered(["640", "-2"]).render(),
            "scale=640:-2"
        );
        assert_eq!(
            FilterSpec::new("drawtext")
                .verbatim("text='a\\:b':x=10")
                .render(),
            "drawtext=text='a\\:b':x=10"
        );
    }

    #[test]
    fn empty_options_omit_equals_sign() {
        assert_eq!(FilterSpec::new("null").ordered(Vec::<String>::new()).render(), "null");
        assert_eq!(FilterSpec::from("hflip").render(), "hflip");
    }

    #[test]
    fn values_are_not_escaped() {
        let spec = FilterSpec::new("scale")
            .named([("w", "'if(gt(a,4/3),640,trunc(480*a/2)*2)'"), ("h", "480")]);
        assert_eq!(
            spec.render(),
            "scale=w='if(gt(a,4/3),640,trunc(480*a/2)*2)':h=480"
        );
    }

    #[test]
    fn graph_joins_chains_and_blocks() {
        let graph = FilterGraph::new()
            .chain([
                FilterSpec::new("scale").ordered(["320", "240"]).input("0:v"),
                FilterSpec::new("hflip").output("a"),
            ])
            .chain([FilterSpec::new("anull").input("0:a").output("b")]);
        assert_eq!(
            graph.render(),
            "[0:v]scale=320:240,hflip[a];[0:a]anull[b]"
        );
    }

    #[test]
    fn collected_specs_become_separate_blocks() {
        let graph: FilterGraph = ["hflip", "vflip"].into_iter().collect();
        assert_eq!(graph.render(), "hflip;vflip");
    }

    #[test]
    fn labels_are_bracketed_once() {
        assert_eq!(bracket_label("out"), "[out]");
        assert_eq!(bracket_label("[out]"), "[out]");
    }
}
