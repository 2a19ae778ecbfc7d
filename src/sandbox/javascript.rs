use super::language::render_template;
use super::{HarnessSpec, Language, LanguageRunner};

const HARNESS_TEMPLATE: &str = r#""use strict";
const fs = require("fs");
const vm = require("vm");

const ENTRY_METHOD = %ENTRY_METHOD%;
const SOURCE_PATH = %SOURCE_PATH%;
const MODULE_NAME = %MODULE_NAME%;

function fail(message) {
  process.stderr.write(message + "\n");
  process.exit(1);
}

if (!ENTRY_METHOD) {
  fail("no entry method configured for this problem");
}
if (!/^[A-Za-z_$][\w$]*$/.test(ENTRY_METHOD)) {
  fail("entry method " + JSON.stringify(ENTRY_METHOD) + " is not a valid identifier");
}

const silent = () => {};
const candidateModule = { exports: {} };
const context = vm.createContext({
  module: candidateModule,
  exports: candidateModule.exports,
  require,
  console: { log: silent, info: silent, warn: silent, error: silent, debug: silent },
});

vm.runInContext(fs.readFileSync(SOURCE_PATH, "utf8"), context, { filename: MODULE_NAME + ".js" });

const lookup = (name) =>
  vm.runInContext("typeof " + name + " === \"undefined\" ? undefined : " + name, context);

function resolve() {
  const Solution = lookup("Solution");
  if (
    typeof Solution === "function" &&
    Solution.prototype &&
    typeof Solution.prototype[ENTRY_METHOD] === "function"
  ) {
    const instance = new Solution();
    return instance[ENTRY_METHOD].bind(instance);
  }
  const exported = candidateModule.exports && candidateModule.exports[ENTRY_METHOD];
  if (typeof exported === "function") {
    return exported;
  }
  const global = lookup(ENTRY_METHOD);
  if (typeof global === "function") {
    return global;
  }
  fail("entry method " + ENTRY_METHOD + " not found in submitted code");
}

const raw = fs.readFileSync(0, "utf8");
const parse = vm.runInContext("JSON.parse", context);
const input = raw.trim() ? parse(raw) : {};
const target = resolve();
const result = target(...Object.values(input));
process.stdout.write(JSON.stringify(result === undefined ? null : result));
"#;

pub struct JavaScript {
    command: Vec<String>,
}

impl JavaScript {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl LanguageRunner for JavaScript {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn source_extension(&self) -> &'static str {
        "js"
    }

    fn command(&self) -> &[String] {
        &self.command
    }

    fn render_harness(&self, spec: &HarnessSpec<'_>) -> String {
        render_template(HARNESS_TEMPLATE, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_render_harness() {
        let js = JavaScript::new(vec!["node".to_string()]);
        let harness = js.render_harness(&HarnessSpec {
            source_path: Path::new("/tmp/sub_1.js"),
            module_name: "sub_1",
            entry_method: "isPalindrome",
        });

        assert!(harness.starts_with("\"use strict\";"));
        assert!(harness.contains(r#"const ENTRY_METHOD = "isPalindrome";"#));
        assert!(harness.contains(r#"const SOURCE_PATH = "/tmp/sub_1.js";"#));
        assert!(!harness.contains("%MODULE_NAME%"));
    }

    #[test]
    fn test_empty_entry_method_is_rendered_for_fail_fast() {
        let js = JavaScript::new(vec!["node".to_string()]);
        let harness = js.render_harness(&HarnessSpec {
            source_path: Path::new("/tmp/sub_2.js"),
            module_name: "sub_2",
            entry_method: "",
        });

        assert!(harness.contains(r#"const ENTRY_METHOD = "";"#));
    }
}
