//! Built-in content block for the training-side trace recorder.
//!
//! Inserted after the executor group computes `self.arg_names`, it dumps the
//! argument names to `$TRACE_DIR/arg_namesINpara_names.txt`. The recorder reads
//! that file to map gradient indices back to parameter names.

pub const ARG_NAMES_FILE: &str = "arg_namesINpara_names.txt";

pub fn trace_snippet() -> Vec<String> {
    vec![
        "import os".to_string(),
        "if os.environ.get(\"TRACE_ON\") == \"ON\":".to_string(),
        format!(
            "    with open(os.path.join(os.environ.get(\"TRACE_DIR\", \".\"), \"{}\"), \"w\") as _f:",
            ARG_NAMES_FILE
        ),
        "        for _name in self.arg_names:".to_string(),
        "            _f.write(_name + \"\\n\")".to_string(),
    ]
}
