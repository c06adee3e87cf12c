mod common;

#[cfg(test)]
mod interpreter_tests {
    use rox as lox;

    use std::io::BufWriter;

    use lox::error::LoxError;
    use lox::interpreter::DEFAULT_MAX_CALL_DEPTH;
    use lox::Lox;

    use assert_matches::assert_matches;

    use super::common::{
        on_interpreter_stack, output, run, runtime_error, session, session_with_depth, SharedBuffer,
    };

    // ───────────────────────── expressions ─────────────────────────

    #[test]
    fn test_precedence() {
        assert_eq!(output("print -2 + 3 * 4;"), "10\n");
        assert_eq!(output("print (-2 + 3) * 4;"), "4\n");
        assert_eq!(output("print 1 - 2 - 3;"), "-4\n");
        assert_eq!(output("print 2 < 3 == true;"), "true\n");
    }

    #[test]
    fn test_division() {
        assert_eq!(output("print 1 / 2;"), "0.5\n");
        assert_eq!(runtime_error("print 1 / 0;"), "Division by zero.\n[line 1]");
        assert_eq!(
            runtime_error("print \"a\" / 1;"),
            "Operands must be numbers.\n[line 1]"
        );
    }

    #[test]
    fn test_remainder() {
        assert_eq!(output("print 7 % 3;"), "1\n");
        assert_eq!(runtime_error("print 7 % 0;"), "Division by zero.\n[line 1]");
    }

    #[test]
    fn test_plus_is_strict() {
        assert_eq!(output("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(
            runtime_error("print 1 + \"a\";"),
            "Operands must be two numbers or two strings.\n[line 1]"
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(output("print -(3); print !nil; print !0;"), "-3\ntrue\nfalse\n");
        assert_eq!(
            runtime_error("print -\"a\";"),
            "Operand must be a number.\n[line 1]"
        );
    }

    #[test]
    fn test_truthiness() {
        let source = r#"
            if (0) print "zero";
            if ("") print "empty";
            if (nil) print "nil"; else print "falsy";
        "#;

        assert_eq!(output(source), "zero\nempty\nfalsy\n");
    }

    #[test]
    fn test_logical_short_circuit() {
        let source = r#"
            fun boom() { print "evaluated"; return true; }
            print nil or "yes";
            print false and boom();
            print true or boom();
            print 1 and 2;
        "#;

        assert_eq!(output(source), "yes\nfalse\ntrue\n2\n");
    }

    #[test]
    fn test_equality() {
        let source = r#"
            print nil == nil;
            print nil == false;
            print 1 == 1;
            print "a" == "a";
            print 1 == "1";
            class P {}
            var p = P();
            print p == p;
            print P() == P();
        "#;

        assert_eq!(
            output(source),
            "true\nfalse\ntrue\ntrue\nfalse\ntrue\nfalse\n"
        );
    }

    #[test]
    fn test_value_display() {
        let source = r#"
            fun f() {}
            class K {}
            print 3.0;
            print 2.5;
            print nil;
            print clock;
            print f;
            print fun () {};
            print K;
            print K();
        "#;

        assert_eq!(
            output(source),
            "3\n2.5\nnil\n<native fn clock>\n<fn f>\n<fn>\nK\nK instance\n"
        );
    }

    // ───────────────────────── variables and scope ─────────────────────────

    #[test]
    fn test_block_scoping() {
        let source = r#"
            var a = "global";
            {
                var a = "outer";
                {
                    var a = "inner";
                    print a;
                }
                print a;
            }
            print a;
        "#;

        assert_eq!(output(source), "inner\nouter\nglobal\n");
    }

    #[test]
    fn test_closure_binds_at_declaration() {
        let source = r#"
            var x = "global";
            {
                fun show() { print x; }
                show();
                var x = "local";
                show();
                print x;
            }
        "#;

        assert_eq!(output(source), "global\nglobal\nlocal\n");
    }

    #[test]
    fn test_undefined_variable() {
        assert_eq!(
            runtime_error("print missing;"),
            "Undefined variable 'missing'.\n[line 1]"
        );
        assert_eq!(
            runtime_error("missing = 1;"),
            "Undefined variable 'missing'.\n[line 1]"
        );
    }

    #[test]
    fn test_runtime_error_stops_the_run() {
        let (out, report) = run("print 1;\nprint missing;\nprint 2;");

        assert_eq!(out, "1\n");
        assert_eq!(report.exit_code(), 70);
        assert_matches!(report.runtime_error, Some(LoxError::Runtime { line: 2, .. }));
    }

    #[test]
    fn test_output_is_flushed_before_runtime_error() {
        let buffer = SharedBuffer::default();
        let mut lox = Lox::with_output(Box::new(BufWriter::new(buffer.clone())));

        let report = lox.run("print 1;\nprint nil + 1;");

        assert_eq!(report.exit_code(), 70);
        assert_eq!(buffer.contents(), "1\n");
    }

    // ───────────────────────── control flow ─────────────────────────

    #[test]
    fn test_while_and_for() {
        let source = r#"
            var i = 0;
            while (i < 3) { print i; i = i + 1; }
            for (var j = 0; j < 2; j = j + 1) print j;
        "#;

        assert_eq!(output(source), "0\n1\n2\n0\n1\n");
    }

    #[test]
    fn test_break_exits_innermost_loop() {
        let source = r#"
            var i = 0;
            while (true) { i = i + 1; if (i == 3) break; }
            print i;
            for (var j = 0; j < 3; j = j + 1) {
                for (var k = 0; k < 10; k = k + 1) {
                    if (k == 1) break;
                    print j * 10 + k;
                }
            }
        "#;

        assert_eq!(output(source), "3\n0\n10\n20\n");
    }

    #[test]
    fn test_return_unwinds_loops() {
        let source = r#"
            fun first(limit) {
                for (var i = 0; i < limit; i = i + 1) {
                    while (true) { return i + 100; }
                }
                return -1;
            }
            print first(5);
            print first(0);
        "#;

        assert_eq!(output(source), "100\n-1\n");
    }

    // ───────────────────────── functions ─────────────────────────

    #[test]
    fn test_recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "#;

        assert_eq!(output(source), "55\n");
    }

    #[test]
    fn test_make_counter_closures_are_independent() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    return i;
                }
                return count;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a();
            print a();
            print b();
            print a();
        "#;

        assert_eq!(output(source), "1\n2\n1\n3\n");
    }

    #[test]
    fn test_lambdas() {
        let source = r#"
            var add = fun (a, b) { return a + b; };
            fun twice(f, x) { return f(f(x)); }
            print add(1, 2);
            print twice(fun (n) { return n * 3; }, 2);
        "#;

        assert_eq!(output(source), "3\n18\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(output("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_call_errors() {
        assert_eq!(
            runtime_error("\"a\"();"),
            "Can only call functions and classes.\n[line 1]"
        );
        assert_eq!(
            runtime_error("fun f(a) {} f();"),
            "Expected 1 arguments but got 0.\n[line 1]"
        );
        assert_eq!(
            runtime_error("clock(1);"),
            "Expected 0 arguments but got 1.\n[line 1]"
        );
    }

    #[test]
    fn test_call_depth_limit() {
        let error = on_interpreter_stack(50, || {
            let (mut lox, _) = session_with_depth(50);
            let report = lox.run("fun f(n) { return f(n + 1); }\nf(0);");
            report.runtime_error.map(|e| e.to_string())
        });

        assert_eq!(error.as_deref(), Some("Stack overflow.\n[line 1]"));
    }

    #[test]
    fn test_default_depth_allows_ordinary_recursion() {
        let source = "fun count(n) { if (n == 0) return 0; return 1 + count(n - 1); }\n";

        let out = on_interpreter_stack(DEFAULT_MAX_CALL_DEPTH, move || {
            output(&format!("{}print count(500);", source))
        });
        assert_eq!(out, "500\n");

        let error = on_interpreter_stack(DEFAULT_MAX_CALL_DEPTH, move || {
            runtime_error(&format!("{}count(5000);", source))
        });
        assert_eq!(error, "Stack overflow.\n[line 1]");
    }

    #[test]
    fn test_call_depth_resets_after_overflow() {
        let (mut lox, buffer) = session_with_depth(10);

        let report = lox.run("fun down(n) { if (n == 0) return 0; return down(n - 1); }\ndown(20);");
        assert_eq!(report.exit_code(), 70);

        let report = lox.run("print down(5);");
        assert_eq!(report.exit_code(), 0);
        assert_eq!(buffer.contents(), "0\n");
    }

    // ───────────────────────── classes ─────────────────────────

    #[test]
    fn test_fields_and_methods() {
        let source = r#"
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            p.x = 10;
            print p.sum();
            var m = p.sum;
            print m();
        "#;

        assert_eq!(output(source), "12\n12\n");
    }

    #[test]
    fn test_instances_are_shared() {
        let source = r#"
            class Box {}
            var a = Box();
            var b = a;
            b.v = "shared";
            print a.v;
        "#;

        assert_eq!(output(source), "shared\n");
    }

    #[test]
    fn test_initializer_always_returns_instance() {
        let source = r#"
            class A {
                init() { this.v = 1; return; }
            }
            var a = A();
            print a.init().v;
            print a;
        "#;

        assert_eq!(output(source), "1\nA instance\n");
    }

    #[test]
    fn test_class_arity_follows_init() {
        assert_eq!(
            runtime_error("class A { init(a, b) {} }\nA(1);"),
            "Expected 2 arguments but got 1.\n[line 2]"
        );
        assert_eq!(
            runtime_error("class A {}\nA(1);"),
            "Expected 0 arguments but got 1.\n[line 2]"
        );
    }

    #[test]
    fn test_super_dispatch() {
        let source = r#"
            class A { method() { return "A"; } }
            class B < A {
                method() { return "B"; }
                test() { return super.method(); }
            }
            class C < B {}
            print C().test();
            print C().method();
        "#;

        assert_eq!(output(source), "A\nB\n");
    }

    #[test]
    fn test_inherited_initializer() {
        let source = r#"
            class Base { init(n) { this.n = n; } }
            class Derived < Base {
                init(n) { super.init(n * 2); }
                value() { return this.n; }
            }
            print Derived(4).value();
        "#;

        assert_eq!(output(source), "8\n");
    }

    #[test]
    fn test_self_inheritance_is_rejected_before_running() {
        let (out, report) = run("print 1; class A < A {}");

        assert_eq!(out, "");
        assert_eq!(report.exit_code(), 64);
        assert_eq!(
            report.errors[0].to_string(),
            "[Line 1] Error at 'A': A class can't inherit from itself."
        );
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        assert_eq!(
            runtime_error("var x = 1;\nclass A < x {}"),
            "Superclass must be a class.\n[line 2]"
        );
    }

    #[test]
    fn test_getters() {
        let source = r#"
            class Circle {
                init(r) { this.r = r; }
                area { return 3 * this.r * this.r; }
            }
            print Circle(2).area;
        "#;

        assert_eq!(output(source), "12\n");
    }

    #[test]
    fn test_static_methods() {
        let source = r#"
            class Math {
                class square(n) { return n * n; }
                class version { return 2; }
                class self() { return this; }
            }
            print Math.square(3);
            print Math.version;
            print Math.self();
        "#;

        assert_eq!(output(source), "9\n2\nMath\n");
    }

    #[test]
    fn test_static_inheritance_and_super() {
        let source = r#"
            class A { class make() { return "A.make"; } }
            class B < A { class make() { return "B+" + super.make(); } }
            class D < A {}
            print B.make();
            print D.make();
        "#;

        assert_eq!(output(source), "B+A.make\nA.make\n");
    }

    #[test]
    fn test_property_errors() {
        assert_eq!(
            runtime_error("class A {}\nprint A().missing;"),
            "Undefined property 'missing'.\n[line 2]"
        );
        assert_eq!(
            runtime_error("var a = 1;\na.x = 2;"),
            "Only instances have fields.\n[line 2]"
        );
        assert_eq!(
            runtime_error("var a = \"s\";\nprint a.x;"),
            "Only instances have properties.\n[line 2]"
        );
    }

    #[test]
    fn test_operator_overloads() {
        let source = r#"
            class Vec {
                init(x, y) { this.x = x; this.y = y; }
                class operator +(a, b) { return Vec(a.x + b.x, a.y + b.y); }
                class operator ==(a, b) { return a.x == b.x and a.y == b.y; }
            }
            var v = Vec(1, 2) + Vec(3, 4);
            print v.x;
            print v.y;
            print Vec(1, 2) == Vec(1, 2);
        "#;

        assert_eq!(output(source), "4\n6\ntrue\n");
    }

    #[test]
    fn test_operator_overload_on_right_operand() {
        let source = r#"
            class S { class operator +(a, b) { return "S"; } }
            print 1 + S();
        "#;

        assert_eq!(output(source), "S\n");
    }

    #[test]
    fn test_operator_overloads_are_inherited() {
        let source = r#"
            class Num {
                init(n) { this.n = n; }
                class operator <(a, b) { return a.n < b.n; }
            }
            class Int < Num {}
            print Int(1) < Int(2);
        "#;

        assert_eq!(output(source), "true\n");
    }

    const LOCAL_CLASSES: &str = r#"
        class A {
            init(x) { this.x = x; }
            tag { return "a"; }
            describe() { return "A" + this.tag; }
            adder() { return fun (n) { return A(this.x + n); }; }
            class make(x) { return this(x); }
            class operator +(l, r) { return A(l.x + r.x); }
        }
        class B < A {
            tag { return "b"; }
            describe() { return super.describe() + "!"; }
            class make(x) { return super.make(x * 10); }
        }
        fun build() { return B(1); }
        var sum = A(1) + B.make(2);
        print sum.x;
        print B(3).describe();
        print build().x;
        print B(5).adder()(2).x;
        print typeof(B.make(1));
    "#;

    #[test]
    fn test_classes_declared_in_a_block() {
        let source = format!("{{ {} }}", LOCAL_CLASSES);

        assert_eq!(output(&source), "21\nAb!\n1\n7\nB\n");
    }

    #[test]
    fn test_classes_declared_in_a_function() {
        let source = format!(
            "fun main() {{ {} return build; }}\nvar build = main();\nprint build().x;",
            LOCAL_CLASSES
        );

        assert_eq!(output(&source), "21\nAb!\n1\n7\nB\n1\n");
    }

    // ───────────────────────── arrays ─────────────────────────

    #[test]
    fn test_array_members() {
        let source = r#"
            var a = Array(3);
            print a.length;
            print a.get(0);
            a.set(1, "x");
            print a[1];
            print a;
        "#;

        assert_eq!(output(source), "3\nnil\nx\n[nil, x, nil]\n");
    }

    #[test]
    fn test_array_bounds() {
        assert_eq!(
            runtime_error("var a = Array(3);\nprint a.get(3);"),
            "Index out of range.\n[line 2]"
        );
        assert_eq!(
            runtime_error("var a = Array(3);\na.set(-1, 1);"),
            "Index out of range.\n[line 2]"
        );
        assert_eq!(
            runtime_error("var a = [1];\nprint a[\"0\"];"),
            "Index must be a number.\n[line 2]"
        );
    }

    #[test]
    fn test_array_literals_and_indexing() {
        let source = r#"
            var a = [1, 2, nil];
            print a;
            a[0] = 5;
            print a[0];
            print a[1.9];
            print [];
        "#;

        assert_eq!(output(source), "[1, 2, nil]\n5\n2\n[]\n");
    }

    #[test]
    fn test_self_containing_array() {
        assert_eq!(
            output("var a = Array(2); a[0] = a; print a;"),
            "[[...], nil]\n"
        );
    }

    #[test]
    fn test_mutually_containing_arrays() {
        let source = "var a = Array(1); var b = Array(1); a[0] = b; b[0] = a; print a; print b;";

        assert_eq!(output(source), "[[[...]]]\n[[[...]]]\n");
    }

    #[test]
    fn test_shared_array_is_not_a_cycle() {
        assert_eq!(output("var c = [1]; print [c, [c]];"), "[[1], [[1]]]\n");
    }

    #[test]
    fn test_oversized_array_is_a_runtime_error() {
        assert_eq!(
            runtime_error("var a = Array(100000000000000000000);\nprint a.length;"),
            "Array size too large.\n[line 1]"
        );
        assert_eq!(
            runtime_error("Array(1000000000);"),
            "Array size too large.\n[line 1]"
        );
        assert_eq!(output("print Array(3).length;"), "3\n");
    }

    #[test]
    fn test_array_errors() {
        assert_eq!(
            runtime_error("var n = 1;\nprint n[0];"),
            "Only arrays can be indexed.\n[line 2]"
        );
        assert_eq!(
            runtime_error("Array(-1);"),
            "Array size must be a non-negative number.\n[line 1]"
        );
        assert_eq!(
            runtime_error("var a = Array(1);\nprint a.push;"),
            "Undefined property 'push'.\n[line 2]"
        );
    }

    #[test]
    fn test_array_length_is_fixed() {
        let source = r#"
            var a = [1, 2];
            var set = a.set;
            set(0, 9);
            print a;
            print a.length;
        "#;

        assert_eq!(output(source), "[9, 2]\n2\n");
    }

    // ───────────────────────── standard library ─────────────────────────

    #[test]
    fn test_typeof() {
        let source = r#"
            class Foo {}
            print typeof(3);
            print typeof("x");
            print typeof(Array(1));
            print typeof(Foo());
            print typeof(Foo);
            print typeof(nil);
            print typeof(true);
            print typeof(clock);
            print typeof(fun () {});
        "#;

        assert_eq!(
            output(source),
            "number\nstring\narray\nFoo\nFoo\nnil\nboolean\ncallable\ncallable\n"
        );
    }

    #[test]
    fn test_clock_returns_seconds() {
        assert_eq!(output("print clock() > 1000000000;"), "true\n");
    }

    // ───────────────────────── sessions ─────────────────────────

    #[test]
    fn test_session_keeps_globals_between_runs() {
        let (mut lox, buffer) = session();

        assert!(lox.run("var a = 1;").is_ok());
        assert!(lox.run("fun f() { return a + 1; }").is_ok());
        assert!(lox.run("print f();").is_ok());

        assert_eq!(buffer.contents(), "2\n");
    }

    #[test]
    fn test_session_closures_survive_between_runs() {
        let (mut lox, buffer) = session();

        lox.run(
            "fun mk() { var c = 0; fun inc() { c = c + 1; return c; } return inc; }
             var i = mk();",
        );
        lox.run("{ var unrelated = 0; print i() + unrelated; }");
        lox.run("print i();");

        assert_eq!(buffer.contents(), "1\n2\n");
    }

    #[test]
    fn test_session_recovers_after_errors() {
        let (mut lox, buffer) = session();

        assert_eq!(lox.run("print missing;").exit_code(), 70);
        assert_eq!(lox.run("print ;").exit_code(), 64);
        assert_eq!(lox.run("print 1;").exit_code(), 0);

        assert_eq!(buffer.contents(), "1\n");
    }
}
