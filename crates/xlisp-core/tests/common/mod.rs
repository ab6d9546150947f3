#![allow(dead_code)]

use xlisp_core::error::XlispError;
use xlisp_core::options::EvalOptions;
use xlisp_core::runtime::RuntimeCtx;
use xlisp_core::Value;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn options() -> EvalOptions {
    EvalOptions {
        default_namespace: "user".into(),
        check_namespaces: true,
        no_core: false,
        source_name: Some("test".into()),
    }
}

pub fn ctx() -> RuntimeCtx {
    init_logging();
    RuntimeCtx::new(options())
}

pub fn eval(src: &str) -> Value {
    ctx()
        .eval_source(src)
        .unwrap_or_else(|e| panic!("failed to evaluate {}: {}", src, e))
}

pub fn eval_err(src: &str) -> XlispError {
    match ctx().eval_source(src) {
        Ok(value) => panic!("expected {} to fail, got {}", src, value),
        Err(err) => err,
    }
}
