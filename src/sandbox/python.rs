use super::language::render_template;
use super::{HarnessSpec, Language, LanguageRunner};

const HARNESS_TEMPLATE: &str = r#"import contextlib
import importlib.util
import io
import json
import sys
import typing

ENTRY_METHOD = %ENTRY_METHOD%
SOURCE_PATH = %SOURCE_PATH%
MODULE_NAME = %MODULE_NAME%


def fail(message):
    sys.stderr.write(message + "\n")
    sys.exit(1)


def load_candidate():
    spec = importlib.util.spec_from_file_location(MODULE_NAME, SOURCE_PATH)
    module = importlib.util.module_from_spec(spec)
    for name in ("List", "Dict", "Optional", "Tuple", "Set"):
        setattr(module, name, getattr(typing, name))
    sys.modules[MODULE_NAME] = module
    spec.loader.exec_module(module)
    return module


def resolve(module):
    solution = getattr(module, "Solution", None)
    if isinstance(solution, type) and callable(getattr(solution, ENTRY_METHOD, None)):
        return getattr(solution(), ENTRY_METHOD)
    target = getattr(module, ENTRY_METHOD, None)
    if callable(target):
        return target
    fail("entry method %r not found in submitted code" % ENTRY_METHOD)


def main():
    if not ENTRY_METHOD:
        fail("no entry method configured for this problem")
    data = json.loads(sys.stdin.read() or "{}")
    with contextlib.redirect_stdout(io.StringIO()):
        target = resolve(load_candidate())
        result = target(*data.values())
    sys.stdout.write(json.dumps(result))
    sys.stdout.flush()


main()
"#;

pub struct Python {
    command: Vec<String>,
}

impl Python {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl LanguageRunner for Python {
    fn language(&self) -> Language {
        Language::Python
    }

    fn source_extension(&self) -> &'static str {
        "py"
    }

    fn command(&self) -> &[String] {
        &self.command
    }

    fn render_harness(&self, spec: &HarnessSpec<'_>) -> String {
        render_template(HARNESS_TEMPLATE, spec)
    }
}
