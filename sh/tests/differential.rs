//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

//! Runs the same programs through minish and bash and compares the results.
//! The tests pass trivially when bash is not installed.

use plib::run_differential;

fn compare(program: &str, operands: &[&str], compare_stderr: bool) {
    // an explicit $0 makes diagnostics comparable
    let args: Vec<String> = ["-c", program, "sh"]
        .iter()
        .chain(operands)
        .map(|s| s.to_string())
        .collect();
    let Some((output, reference)) = run_differential("minish", &args, b"") else {
        eprintln!("no reference shell available, skipping `{program}`");
        return;
    };
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&reference.stdout),
        "stdout differs for `{program}`"
    );
    if compare_stderr {
        assert_eq!(
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&reference.stderr),
            "stderr differs for `{program}`"
        );
    }
    assert_eq!(
        output.status.code(),
        reference.status.code(),
        "exit status differs for `{program}`"
    );
}

fn same_as_reference(program: &str) {
    compare(program, &[], true);
}

#[test]
fn lists_and_pipelines() {
    same_as_reference("false | true");
    same_as_reference("true | false");
    same_as_reference("false && echo x; true || echo y; echo $?");
    same_as_reference("! false | false; echo $?");
    same_as_reference("yes | head -c 100000 >/dev/null");
}

#[test]
fn compound_commands() {
    same_as_reference("case abc in a) echo A;; *c) echo C;; esac");
    same_as_reference("for x in a 'b c'; do echo \"<$x>\"; done");
    same_as_reference("i=; while [ \"$i\" != ...  ]; do i=.$i; echo $i; done");
    same_as_reference("(A=123); echo \"[$A]\"");
    same_as_reference("if false; then :; elif true; then echo elif; fi");
}

#[test]
fn functions() {
    same_as_reference("A=3; f() { echo $A; }; A=100 f; echo $A");
    same_as_reference("f() { echo $#:$1; return 4; }; f x y; echo $?");
    same_as_reference("f() { for i in 1 2 3; do return $i; done; }; f; echo $?");
}

#[test]
fn expansions() {
    same_as_reference("echo $(echo $(echo world))");
    same_as_reference("for x in 1$(echo 1 2 3)3; do echo $x; done");
    same_as_reference("echo 'single $quotes' \"double $0\"");
    same_as_reference("E=; echo ${U-a} ${U:-b} ${E-c} ${E:-d} ${E+e} ${E:+f} ${#E}");
    same_as_reference("echo ${A=x} ${B:=y} $A$B");
    same_as_reference("V='  a   b  '; echo [$V] \"[$V]\"");
    same_as_reference("IFS=:; V=a:b::c; for f in $V; do echo \"<$f>\"; done");
    same_as_reference("E=; for f in \"\"$E $E''; do echo \"<$f>\"; done");
    compare("for a in \"$@\"; do echo \"[$a]\"; done; echo $# \"$*\"", &["a b", "", "c"], true);
}

#[test]
fn errors() {
    same_as_reference("nosuch; echo $?");
    same_as_reference("nosuch");
    same_as_reference("echo ${V?}; echo unreachable");
    same_as_reference("/no/such/file");
}

#[test]
fn syntax_errors() {
    same_as_reference("echo a; fi");
    same_as_reference("echo a; if true; then echo b");
    same_as_reference("case x in ;; esac");
    same_as_reference("echo a >");
    same_as_reference("echo 'abc");
    same_as_reference("{ echo a }");
}
