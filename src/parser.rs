use std::path::{Path, PathBuf};

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::visit::Visit;

use crate::node::{Module, NodeOrigin, NodeWrapper, SourceTree, IDENT_KIND};

/// Check if attributes contain `#[test]`.
fn has_test_attr(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident("test"))
}

/// Check if attributes contain `#[cfg(test)]`.
fn has_cfg_test_attr(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && attr
                .parse_args::<syn::Ident>()
                .is_ok_and(|ident| ident == "test")
    })
}

/// Lowers syn AST nodes into the engine's generic parsed-tree shape.
///
/// Grammar categories become `kind` strings; operator, range-limit and
/// macro-name details are folded into the kind so the canonicalizer
/// preserves them while abstracting leaf values. Identifiers (variables,
/// paths, type names) all lower to `Ident` leaves and so stay
/// rename-invariant downstream.
struct Lower {
    file: PathBuf,
}

impl Lower {
    fn origin(&self, span: Span) -> NodeOrigin {
        let start = span.start();
        NodeOrigin::new(self.file.clone(), start.line, start.column)
    }

    fn ident(&self, ident: &syn::Ident) -> SourceTree {
        SourceTree::leaf(IDENT_KIND, ident.to_string(), self.origin(ident.span()))
    }

    fn fn_tree(&self, sig: &syn::Signature, block: &syn::Block) -> SourceTree {
        let mut children = vec![self.ident(&sig.ident)];
        for input in &sig.inputs {
            children.push(self.fn_arg(input));
        }
        if let syn::ReturnType::Type(_, ty) = &sig.output {
            children.push(SourceTree::branch(
                "ReturnType",
                self.origin(ty.span()),
                vec![self.ty(ty)],
            ));
        }
        children.push(self.block(block));
        SourceTree::branch("Fn", self.origin(sig.ident.span()), children)
    }

    fn fn_arg(&self, arg: &syn::FnArg) -> SourceTree {
        match arg {
            syn::FnArg::Receiver(recv) => {
                SourceTree::branch("Receiver", self.origin(recv.span()), vec![])
            }
            syn::FnArg::Typed(pat_ty) => SourceTree::branch(
                "Param",
                self.origin(pat_ty.span()),
                vec![self.pat(&pat_ty.pat), self.ty(&pat_ty.ty)],
            ),
        }
    }

    fn block(&self, block: &syn::Block) -> SourceTree {
        let children = block.stmts.iter().map(|s| self.stmt(s)).collect();
        SourceTree::branch("Block", self.origin(block.span()), children)
    }

    fn stmt(&self, stmt: &syn::Stmt) -> SourceTree {
        match stmt {
            syn::Stmt::Local(local) => {
                let mut children = vec![self.pat(&local.pat)];
                if let Some(init) = &local.init {
                    children.push(self.expr(&init.expr));
                    if let Some((_, diverge)) = &init.diverge {
                        children.push(self.expr(diverge));
                    }
                }
                SourceTree::branch("Let", self.origin(local.span()), children)
            }
            syn::Stmt::Expr(expr, Some(_)) => SourceTree::branch(
                "Semi",
                self.origin(expr.span()),
                vec![self.expr(expr)],
            ),
            syn::Stmt::Expr(expr, None) => self.expr(expr),
            syn::Stmt::Macro(mac) => self.macro_call(&mac.mac),
            // Nested items are extracted as their own units by the visitor.
            syn::Stmt::Item(item) => {
                SourceTree::branch("Item", self.origin(item.span()), vec![])
            }
        }
    }

    fn expr(&self, expr: &syn::Expr) -> SourceTree {
        let origin = self.origin(expr.span());
        match expr {
            syn::Expr::Array(e) => SourceTree::branch(
                "Array",
                origin,
                e.elems.iter().map(|x| self.expr(x)).collect(),
            ),
            syn::Expr::Assign(e) => SourceTree::branch(
                "Assign",
                origin,
                vec![self.expr(&e.left), self.expr(&e.right)],
            ),
            syn::Expr::Async(e) => SourceTree::branch("Async", origin, vec![self.block(&e.block)]),
            syn::Expr::Await(e) => SourceTree::branch("Await", origin, vec![self.expr(&e.base)]),
            syn::Expr::Binary(e) => SourceTree::branch(
                format!("Binary({})", bin_op(&e.op)),
                origin,
                vec![self.expr(&e.left), self.expr(&e.right)],
            ),
            syn::Expr::Block(e) => self.block(&e.block),
            syn::Expr::Break(e) => SourceTree::branch(
                "Break",
                origin,
                e.expr.iter().map(|x| self.expr(x)).collect(),
            ),
            syn::Expr::Call(e) => {
                let mut children = vec![self.expr(&e.func)];
                children.extend(e.args.iter().map(|x| self.expr(x)));
                SourceTree::branch("Call", origin, children)
            }
            syn::Expr::Cast(e) => {
                SourceTree::branch("Cast", origin, vec![self.expr(&e.expr), self.ty(&e.ty)])
            }
            syn::Expr::Closure(e) => {
                let mut children: Vec<SourceTree> =
                    e.inputs.iter().map(|p| self.pat(p)).collect();
                children.push(self.expr(&e.body));
                SourceTree::branch("Closure", origin, children)
            }
            syn::Expr::Continue(_) => SourceTree::branch("Continue", origin, vec![]),
            syn::Expr::Field(e) => SourceTree::branch(
                "Field",
                origin,
                vec![self.expr(&e.base), self.member(&e.member)],
            ),
            syn::Expr::ForLoop(e) => SourceTree::branch(
                "For",
                origin,
                vec![self.pat(&e.pat), self.expr(&e.expr), self.block(&e.body)],
            ),
            syn::Expr::Group(e) => self.expr(&e.expr),
            syn::Expr::If(e) => {
                let mut children = vec![self.expr(&e.cond), self.block(&e.then_branch)];
                if let Some((_, else_branch)) = &e.else_branch {
                    children.push(self.expr(else_branch));
                }
                SourceTree::branch("If", origin, children)
            }
            syn::Expr::Index(e) => SourceTree::branch(
                "Index",
                origin,
                vec![self.expr(&e.expr), self.expr(&e.index)],
            ),
            syn::Expr::Let(e) => SourceTree::branch(
                "LetGuard",
                origin,
                vec![self.pat(&e.pat), self.expr(&e.expr)],
            ),
            syn::Expr::Lit(e) => self.lit(&e.lit),
            syn::Expr::Loop(e) => SourceTree::branch("Loop", origin, vec![self.block(&e.body)]),
            syn::Expr::Macro(e) => self.macro_call(&e.mac),
            syn::Expr::Match(e) => {
                let mut children = vec![self.expr(&e.expr)];
                for arm in &e.arms {
                    let mut arm_children = vec![self.pat(&arm.pat)];
                    if let Some((_, guard)) = &arm.guard {
                        arm_children.push(self.expr(guard));
                    }
                    arm_children.push(self.expr(&arm.body));
                    children.push(SourceTree::branch(
                        "Arm",
                        self.origin(arm.pat.span()),
                        arm_children,
                    ));
                }
                SourceTree::branch("Match", origin, children)
            }
            syn::Expr::MethodCall(e) => {
                let mut children = vec![self.expr(&e.receiver), self.ident(&e.method)];
                children.extend(e.args.iter().map(|x| self.expr(x)));
                SourceTree::branch("MethodCall", origin, children)
            }
            syn::Expr::Paren(e) => self.expr(&e.expr),
            syn::Expr::Path(e) => self.path(&e.path),
            syn::Expr::Range(e) => {
                let limits = match e.limits {
                    syn::RangeLimits::HalfOpen(_) => "..",
                    syn::RangeLimits::Closed(_) => "..=",
                };
                let mut children = Vec::new();
                if let Some(start) = &e.start {
                    children.push(self.expr(start));
                }
                if let Some(end) = &e.end {
                    children.push(self.expr(end));
                }
                SourceTree::branch(format!("Range({limits})"), origin, children)
            }
            syn::Expr::Reference(e) => {
                let kind = if e.mutability.is_some() { "Ref(mut)" } else { "Ref" };
                SourceTree::branch(kind, origin, vec![self.expr(&e.expr)])
            }
            syn::Expr::Repeat(e) => SourceTree::branch(
                "Repeat",
                origin,
                vec![self.expr(&e.expr), self.expr(&e.len)],
            ),
            syn::Expr::Return(e) => SourceTree::branch(
                "Return",
                origin,
                e.expr.iter().map(|x| self.expr(x)).collect(),
            ),
            syn::Expr::Struct(e) => {
                let mut children = vec![self.path(&e.path)];
                for field in &e.fields {
                    children.push(SourceTree::branch(
                        "FieldValue",
                        self.origin(field.span()),
                        vec![self.member(&field.member), self.expr(&field.expr)],
                    ));
                }
                if let Some(rest) = &e.rest {
                    children.push(self.expr(rest));
                }
                SourceTree::branch("Struct", origin, children)
            }
            syn::Expr::Try(e) => SourceTree::branch("Try", origin, vec![self.expr(&e.expr)]),
            syn::Expr::Tuple(e) => SourceTree::branch(
                "Tuple",
                origin,
                e.elems.iter().map(|x| self.expr(x)).collect(),
            ),
            syn::Expr::Unary(e) => {
                let op = match e.op {
                    syn::UnOp::Deref(_) => "*",
                    syn::UnOp::Not(_) => "!",
                    syn::UnOp::Neg(_) => "-",
                    _ => "?",
                };
                SourceTree::branch(format!("Unary({op})"), origin, vec![self.expr(&e.expr)])
            }
            syn::Expr::Unsafe(e) => {
                SourceTree::branch("Unsafe", origin, vec![self.block(&e.block)])
            }
            syn::Expr::While(e) => SourceTree::branch(
                "While",
                origin,
                vec![self.expr(&e.cond), self.block(&e.body)],
            ),
            _ => SourceTree::branch("Opaque", origin, vec![]),
        }
    }

    fn lit(&self, lit: &syn::Lit) -> SourceTree {
        let origin = self.origin(lit.span());
        let (kind, value) = match lit {
            syn::Lit::Int(l) => ("LitInt", l.to_string()),
            syn::Lit::Float(l) => ("LitFloat", l.to_string()),
            syn::Lit::Str(l) => ("LitStr", l.value()),
            syn::Lit::ByteStr(l) => ("LitByteStr", format!("{:?}", l.value())),
            syn::Lit::Byte(l) => ("LitByte", l.value().to_string()),
            syn::Lit::Char(l) => ("LitChar", l.value().to_string()),
            syn::Lit::Bool(l) => ("LitBool", l.value.to_string()),
            _ => ("Lit", String::new()),
        };
        SourceTree::leaf(kind, value, origin)
    }

    /// Macro contents are opaque; the macro name is preserved in the kind
    /// so different macros never unify.
    fn macro_call(&self, mac: &syn::Macro) -> SourceTree {
        let name = mac
            .path
            .segments
            .last()
            .map(|s| s.ident.to_string())
            .unwrap_or_default();
        SourceTree::branch(format!("Macro({name})"), self.origin(mac.span()), vec![])
    }

    fn member(&self, member: &syn::Member) -> SourceTree {
        match member {
            syn::Member::Named(ident) => self.ident(ident),
            syn::Member::Unnamed(index) => SourceTree::leaf(
                "LitInt",
                index.index.to_string(),
                self.origin(index.span()),
            ),
        }
    }

    /// Single-segment paths collapse to a bare identifier leaf; qualified
    /// paths keep one identifier per segment.
    fn path(&self, path: &syn::Path) -> SourceTree {
        if path.segments.len() == 1 {
            return self.ident(&path.segments[0].ident);
        }
        let children = path.segments.iter().map(|s| self.ident(&s.ident)).collect();
        SourceTree::branch("Path", self.origin(path.span()), children)
    }

    fn pat(&self, pat: &syn::Pat) -> SourceTree {
        let origin = self.origin(pat.span());
        match pat {
            syn::Pat::Ident(p) => {
                let mut tree = self.ident(&p.ident);
                if let Some((_, sub)) = &p.subpat {
                    tree = SourceTree::branch("PatBinding", origin, vec![tree, self.pat(sub)]);
                }
                tree
            }
            syn::Pat::Lit(p) => self.expr(&syn::Expr::Lit(p.clone())),
            syn::Pat::Or(p) => SourceTree::branch(
                "PatOr",
                origin,
                p.cases.iter().map(|c| self.pat(c)).collect(),
            ),
            syn::Pat::Path(p) => self.path(&p.path),
            syn::Pat::Reference(p) => {
                let kind = if p.mutability.is_some() { "PatRef(mut)" } else { "PatRef" };
                SourceTree::branch(kind, origin, vec![self.pat(&p.pat)])
            }
            syn::Pat::Rest(_) => SourceTree::branch("PatRest", origin, vec![]),
            syn::Pat::Slice(p) => SourceTree::branch(
                "PatSlice",
                origin,
                p.elems.iter().map(|e| self.pat(e)).collect(),
            ),
            syn::Pat::Struct(p) => {
                let mut children = vec![self.path(&p.path)];
                for field in &p.fields {
                    children.push(SourceTree::branch(
                        "PatField",
                        self.origin(field.span()),
                        vec![self.member(&field.member), self.pat(&field.pat)],
                    ));
                }
                SourceTree::branch("PatStruct", origin, children)
            }
            syn::Pat::Tuple(p) => SourceTree::branch(
                "PatTuple",
                origin,
                p.elems.iter().map(|e| self.pat(e)).collect(),
            ),
            syn::Pat::TupleStruct(p) => {
                let mut children = vec![self.path(&p.path)];
                children.extend(p.elems.iter().map(|e| self.pat(e)));
                SourceTree::branch("PatTupleStruct", origin, children)
            }
            syn::Pat::Type(p) => SourceTree::branch(
                "PatTyped",
                origin,
                vec![self.pat(&p.pat), self.ty(&p.ty)],
            ),
            syn::Pat::Wild(_) => SourceTree::branch("PatWild", origin, vec![]),
            _ => SourceTree::branch("Opaque", origin, vec![]),
        }
    }

    fn ty(&self, ty: &syn::Type) -> SourceTree {
        let origin = self.origin(ty.span());
        match ty {
            syn::Type::Path(t) => self.path(&t.path),
            syn::Type::Reference(t) => {
                let kind = if t.mutability.is_some() { "TypeRef(mut)" } else { "TypeRef" };
                SourceTree::branch(kind, origin, vec![self.ty(&t.elem)])
            }
            syn::Type::Slice(t) => {
                SourceTree::branch("TypeSlice", origin, vec![self.ty(&t.elem)])
            }
            syn::Type::Array(t) => SourceTree::branch(
                "TypeArray",
                origin,
                vec![self.ty(&t.elem), self.expr(&t.len)],
            ),
            syn::Type::Tuple(t) => SourceTree::branch(
                "TypeTuple",
                origin,
                t.elems.iter().map(|e| self.ty(e)).collect(),
            ),
            syn::Type::Infer(_) => SourceTree::branch("TypeInfer", origin, vec![]),
            _ => SourceTree::branch("Opaque", origin, vec![]),
        }
    }
}

fn bin_op(op: &syn::BinOp) -> &'static str {
    use syn::BinOp::*;
    match op {
        Add(_) => "+",
        Sub(_) => "-",
        Mul(_) => "*",
        Div(_) => "/",
        Rem(_) => "%",
        And(_) => "&&",
        Or(_) => "||",
        BitXor(_) => "^",
        BitAnd(_) => "&",
        BitOr(_) => "|",
        Shl(_) => "<<",
        Shr(_) => ">>",
        Eq(_) => "==",
        Lt(_) => "<",
        Le(_) => "<=",
        Ne(_) => "!=",
        Ge(_) => ">=",
        Gt(_) => ">",
        AddAssign(_) => "+=",
        SubAssign(_) => "-=",
        MulAssign(_) => "*=",
        DivAssign(_) => "/=",
        RemAssign(_) => "%=",
        BitXorAssign(_) => "^=",
        BitAndAssign(_) => "&=",
        BitOrAssign(_) => "|=",
        ShlAssign(_) => "<<=",
        ShrAssign(_) => ">>=",
        _ => "?",
    }
}

/// Walks a parsed file and wraps every function and method as one
/// analyzable unit.
struct UnitExtractor {
    lower: Lower,
    min_size: usize,
    exclude_tests: bool,
    units: Vec<NodeWrapper>,
}

impl UnitExtractor {
    fn add_unit(&mut self, sig: &syn::Signature, block: &syn::Block) {
        let wrapper = NodeWrapper::build(self.lower.fn_tree(sig, block));
        if wrapper.size >= self.min_size {
            self.units.push(wrapper);
        }
    }
}

impl<'ast> Visit<'ast> for UnitExtractor {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        if self.exclude_tests && (has_test_attr(&node.attrs) || has_cfg_test_attr(&node.attrs)) {
            return;
        }
        self.add_unit(&node.sig, &node.block);
        // Continue visiting so nested fns become their own units.
        syn::visit::visit_item_fn(self, node);
    }

    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        if self.exclude_tests && has_cfg_test_attr(&node.attrs) {
            return;
        }
        syn::visit::visit_item_mod(self, node);
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        if self.exclude_tests && has_cfg_test_attr(&node.attrs) {
            return;
        }
        for item in &node.items {
            if let syn::ImplItem::Fn(method) = item {
                if self.exclude_tests && has_test_attr(&method.attrs) {
                    continue;
                }
                self.add_unit(&method.sig, &method.block);
            }
        }
    }
}

/// Parse source text into a module of wrapped units.
pub fn parse_source(
    path: &Path,
    source: &str,
    min_size: usize,
    exclude_tests: bool,
) -> Result<Module, String> {
    let file = syn::parse_file(source)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;

    let mut extractor = UnitExtractor {
        lower: Lower {
            file: path.to_path_buf(),
        },
        min_size,
        exclude_tests,
        units: Vec::new(),
    };
    extractor.visit_file(&file);

    Ok(Module {
        file: path.to_path_buf(),
        units: extractor.units,
    })
}

/// Parse a single Rust file from disk.
pub fn parse_file(path: &Path, min_size: usize, exclude_tests: bool) -> Result<Module, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_source(path, &content, min_size, exclude_tests)
}

/// Parse multiple files, skipping ones that fail with a warning each.
pub fn parse_files(
    paths: &[PathBuf],
    min_size: usize,
    exclude_tests: bool,
) -> (Vec<Module>, Vec<String>) {
    let mut modules = Vec::new();
    let mut warnings = Vec::new();

    for path in paths {
        match parse_file(path, min_size, exclude_tests) {
            Ok(module) => modules.push(module),
            Err(warning) => warnings.push(warning),
        }
    }

    (modules, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::type2_dump;
    use std::path::PathBuf;

    fn parse(code: &str) -> Module {
        parse_source(&PathBuf::from("test.rs"), code, 1, false).unwrap()
    }

    #[test]
    fn extracts_top_level_functions() {
        let module = parse(
            r#"
            fn foo(x: i32) -> i32 {
                let y = x + 1;
                y * 2
            }
            fn bar() {
                do_thing();
            }
            "#,
        );
        assert_eq!(module.units.len(), 2);
        assert_eq!(module.units[0].kind, "Fn");
    }

    #[test]
    fn extracts_methods_from_impl() {
        let module = parse(
            r#"
            struct Foo;
            impl Foo {
                fn bar(&self) -> i32 {
                    42
                }
                fn baz(&mut self, val: i32) {
                    let _ = val + 1;
                }
            }
            "#,
        );
        assert_eq!(module.units.len(), 2);
    }

    #[test]
    fn renamed_functions_dump_identically() {
        let module = parse(
            r#"
            fn process(data: i32) -> i32 {
                let out = data + 1;
                out * 2
            }
            fn compute(value: i32) -> i32 {
                let result = value + 1;
                result * 2
            }
            "#,
        );
        assert_eq!(
            type2_dump(&module.units[0]),
            type2_dump(&module.units[1])
        );
    }

    #[test]
    fn operator_kinds_are_distinguished() {
        let module = parse(
            r#"
            fn add(x: i32) -> i32 { x + 1 }
            fn sub(x: i32) -> i32 { x - 1 }
            "#,
        );
        assert_ne!(
            type2_dump(&module.units[0]),
            type2_dump(&module.units[1])
        );
    }

    #[test]
    fn different_macros_dump_differently() {
        let module = parse(
            r#"
            fn a() { println!("x"); }
            fn b() { eprintln!("x"); }
            "#,
        );
        assert_ne!(
            type2_dump(&module.units[0]),
            type2_dump(&module.units[1])
        );
    }

    #[test]
    fn unit_origin_points_at_function_name() {
        let module = parse("fn one() {}\n\nfn two() {}\n");
        assert_eq!(module.units[0].origin.line, 1);
        assert_eq!(module.units[1].origin.line, 3);
        assert_eq!(module.units[0].origin.file, PathBuf::from("test.rs"));
    }

    #[test]
    fn identifiers_become_labels() {
        let module = parse("fn foo(alpha: i32) -> i32 { alpha + beta }");
        let labels = &module.units[0].labels;
        assert!(labels.contains("alpha"));
        assert!(labels.contains("beta"));
    }

    #[test]
    fn min_size_filters_small_units() {
        let code = r#"
            fn tiny() {}
            fn bigger(x: i32) -> i32 {
                let a = x + 1;
                let b = a * 2;
                a + b
            }
        "#;
        let all = parse_source(&PathBuf::from("t.rs"), code, 1, false).unwrap();
        let filtered = parse_source(&PathBuf::from("t.rs"), code, 10, false).unwrap();
        assert_eq!(all.units.len(), 2);
        assert_eq!(filtered.units.len(), 1);
    }

    #[test]
    fn exclude_tests_skips_test_functions_and_modules() {
        let code = r#"
            fn production(x: i32) -> i32 { x + 1 }

            #[test]
            fn my_test() {
                assert_eq!(production(1), 2);
            }

            #[cfg(test)]
            mod tests {
                fn helper(x: i32) -> i32 { x + 1 }
            }
        "#;
        let with_tests = parse_source(&PathBuf::from("t.rs"), code, 1, false).unwrap();
        let without = parse_source(&PathBuf::from("t.rs"), code, 1, true).unwrap();
        assert_eq!(with_tests.units.len(), 3);
        assert_eq!(without.units.len(), 1);
    }

    #[test]
    fn parse_error_reported_as_warning() {
        let tmp = tempfile::TempDir::new().unwrap();
        let good = tmp.path().join("good.rs");
        let bad = tmp.path().join("bad.rs");
        std::fs::write(&good, "fn good() { let x = 1; }").unwrap();
        std::fs::write(&bad, "fn bad( {").unwrap();
        let (modules, warnings) = parse_files(&[good, bad], 1, false);
        assert_eq!(modules.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("bad.rs"));
    }

    #[test]
    fn match_arms_and_guards_lower() {
        let module = parse(
            r#"
            fn classify(x: i32) -> i32 {
                match x {
                    0 => 10,
                    n if n > 0 => n,
                    _ => -1,
                }
            }
            "#,
        );
        let dump = type2_dump(&module.units[0]);
        assert!(dump.contains("(Match"));
        assert_eq!(dump.matches("(Arm").count(), 3);
    }

    #[test]
    fn nested_functions_are_separate_units() {
        let module = parse(
            r#"
            fn outer() {
                fn inner(x: i32) -> i32 { x + 1 }
                let _ = inner(1);
            }
            "#,
        );
        assert_eq!(module.units.len(), 2);
    }
}
