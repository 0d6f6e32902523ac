//! Page-side shim for bound functions and the reply path back into it.
//!
//! The page calls `window[name](...args)`, which records a promise under a
//! sequence number and posts `{name, seq, args}` through the DevTools
//! binding. The reply resolves or rejects that promise by `seq`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use kiosk_bind::{Registry, Reply};
use kiosk_common::{BrowserError, CallError};

use super::connection::Connection;
use super::protocol::decode;

/// Payload the shim posts for every call.
#[derive(Debug, Deserialize)]
pub(crate) struct BindingCall {
    pub name: String,
    pub seq: u64,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BindingCalled {
    pub name: String,
    pub payload: String,
    pub execution_context_id: i64,
}

/// JS that wraps the raw DevTools binding `name` in a promise-returning function.
pub(crate) fn shim_script(name: &str) -> String {
    let name = js_string(name);
    format!(
        r#"(() => {{
	const bindingName = {name};
	const binding = window[bindingName];
	window[bindingName] = async (...args) => {{
		const me = window[bindingName];
		let errors = me['errors'];
		let callbacks = me['callbacks'];
		if (!callbacks) {{
			callbacks = new Map();
			me['callbacks'] = callbacks;
		}}
		if (!errors) {{
			errors = new Map();
			me['errors'] = errors;
		}}
		const seq = (me['lastSeq'] || 0) + 1;
		me['lastSeq'] = seq;
		const promise = new Promise((resolve, reject) => {{
			callbacks.set(seq, resolve);
			errors.set(seq, reject);
		}});
		binding(JSON.stringify({{name: bindingName, seq, args}}));
		return promise;
	}};
}})();"#
    )
}

/// JS that settles the promise for call `seq` with `reply`.
pub(crate) fn reply_expression(name: &str, seq: u64, reply: &Reply) -> String {
    let name = js_string(name);
    let error = match &reply.error {
        Some(err) => js_string(&err.to_string()),
        None => "null".to_string(),
    };
    let result = reply
        .value
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| "null".to_string());
    format!(
        r#"(() => {{
	const me = window[{name}];
	const error = {error};
	if (error !== null) {{
		me['errors'].get({seq})(error);
	}} else {{
		me['callbacks'].get({seq})({result});
	}}
	me['callbacks'].delete({seq});
	me['errors'].delete({seq});
}})();"#
    )
}

fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Run one `Runtime.bindingCalled` event on its own task and post the reply.
pub(crate) fn spawn_call(params: Value, conn: Arc<Connection>, session_id: String, handlers: Registry) {
    tokio::spawn(async move {
        if let Err(e) = run_call(params, &conn, &session_id, &handlers).await {
            warn!(error = %e, "binding call could not be answered");
        }
    });
}

async fn run_call(
    params: Value,
    conn: &Connection,
    session_id: &str,
    handlers: &Registry,
) -> Result<(), BrowserError> {
    let event: BindingCalled = decode(params)?;
    let call: BindingCall = serde_json::from_str(&event.payload)
        .map_err(|e| BrowserError::Decode(format!("binding payload: {e}")))?;
    if call.name != event.name {
        debug!(event = %event.name, payload = %call.name, "binding name mismatch");
    }

    debug!(name = %call.name, seq = call.seq, args = call.args.len(), "binding called");
    let reply = match handlers.get(&call.name) {
        Some(handler) => {
            let args = call.args;
            match tokio::task::spawn_blocking(move || handler.call(args)).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(name = %call.name, error = %e, "bound function panicked");
                    Reply::failed(CallError::native(format!("{} panicked", call.name)))
                }
            }
        }
        None => Reply::failed(CallError::UnknownBinding(call.name.clone())),
    };
    if let Some(err) = &reply.error {
        debug!(name = %call.name, seq = call.seq, error = %err, "binding returned an error");
    }

    let expression = reply_expression(&call.name, call.seq, &reply);
    conn.call(
        Some(session_id),
        "Runtime.evaluate",
        serde_json::json!({
            "expression": expression,
            "contextId": event.execution_context_id,
        }),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shim_names_the_binding() {
        let script = shim_script("counterAdd");
        assert!(script.contains(r#"const bindingName = "counterAdd";"#));
        assert!(script.contains("JSON.stringify({name: bindingName, seq, args})"));
    }

    #[test]
    fn reply_resolves_with_value() {
        let expr = reply_expression("add", 3, &Reply::value(json!(5)));
        assert!(expr.contains(r#"window["add"]"#));
        assert!(expr.contains("const error = null;"));
        assert!(expr.contains("me['callbacks'].get(3)(5);"));
    }

    #[test]
    fn reply_without_value_resolves_null() {
        let expr = reply_expression("start", 1, &Reply::empty());
        assert!(expr.contains("me['callbacks'].get(1)(null);"));
    }

    #[test]
    fn reply_rejects_with_escaped_message() {
        let reply = Reply::failed(CallError::native("bad \"quote\"\nline"));
        let expr = reply_expression("lookup", 7, &reply);
        assert!(expr.contains(r#"const error = "bad \"quote\"\nline";"#));
    }

    #[test]
    fn decodes_binding_payload() {
        let event: BindingCalled = decode(json!({
            "name": "add",
            "payload": "{\"name\":\"add\",\"seq\":2,\"args\":[2,3]}",
            "executionContextId": 4
        }))
        .unwrap();
        assert_eq!(event.execution_context_id, 4);

        let call: BindingCall = serde_json::from_str(&event.payload).unwrap();
        assert_eq!(call.name, "add");
        assert_eq!(call.seq, 2);
        assert_eq!(call.args, vec![json!(2), json!(3)]);
    }

    #[test]
    fn payload_without_args_is_empty() {
        let call: BindingCall = serde_json::from_str(r#"{"name":"start","seq":1}"#).unwrap();
        assert!(call.args.is_empty());
    }
}
