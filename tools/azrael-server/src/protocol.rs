//! The JSON request/reply protocol: `{cmd, data}` in, `{ok, msg, data}` out.
//! The command set is exactly the broker surface; geometry blobs are
//! referenced by URL and never travel through this channel.

use azrael::broker::{Broker, SpawnRequest};
use azrael::types::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct Request {
    pub cmd: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub ok: bool,
    pub msg: String,
    pub data: Value,
}

impl Response {
    fn done(data: Value) -> Self {
        Self {
            ok: true,
            msg: String::new(),
            data,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            msg: msg.into(),
            data: Value::Null,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetForcePayload {
    object_id: ObjectId,
    force: azrael::math::Vec3,
    #[serde(default)]
    torque: azrael::math::Vec3,
}

#[derive(Debug, Deserialize)]
struct SetBodyStatePayload {
    object_id: ObjectId,
    update: BodyUpdate,
}

#[derive(Debug, Deserialize)]
struct ControlPartsPayload {
    object_id: ObjectId,
    #[serde(default)]
    boosters: Vec<CmdBooster>,
    #[serde(default)]
    factories: Vec<CmdFactory>,
}

fn parse<T: DeserializeOwned>(data: Value) -> Result<T, Response> {
    serde_json::from_value(data).map_err(|err| Response::error(format!("bad request data: {err}")))
}

fn reply<T: Serialize>(result: AzResult<T>) -> Response {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(data) => Response::done(data),
            Err(err) => Response::error(format!("cannot encode reply: {err}")),
        },
        Err(err) => Response::error(err.to_string()),
    }
}

pub fn dispatch(broker: &Broker, request: Request) -> Response {
    let data = request.data;
    match request.cmd.as_str() {
        "ping" => Response::done(Value::from("pong")),
        "add_templates" => match parse::<Vec<Template>>(data) {
            Ok(templates) => reply(broker.add_templates(templates)),
            Err(resp) => resp,
        },
        "get_templates" => match parse::<Vec<String>>(data) {
            Ok(ids) => reply(broker.get_templates(&ids)),
            Err(resp) => resp,
        },
        "spawn" => match parse::<Vec<SpawnRequest>>(data) {
            Ok(requests) => reply(broker.spawn(requests)),
            Err(resp) => resp,
        },
        "remove_objects" => match parse::<Vec<ObjectId>>(data) {
            Ok(ids) => reply(broker.remove_objects(&ids)),
            Err(resp) => resp,
        },
        "set_body_state" => match parse::<SetBodyStatePayload>(data) {
            Ok(p) => reply(broker.set_body_state(p.object_id, p.update)),
            Err(resp) => resp,
        },
        "set_direct_force" => match parse::<SetForcePayload>(data) {
            Ok(p) => reply(broker.set_direct_force(p.object_id, p.force, p.torque)),
            Err(resp) => resp,
        },
        "set_booster_force" => match parse::<SetForcePayload>(data) {
            Ok(p) => reply(broker.set_booster_force(p.object_id, p.force, p.torque)),
            Err(resp) => resp,
        },
        "control_parts" => match parse::<ControlPartsPayload>(data) {
            Ok(p) => reply(broker.control_parts(p.object_id, &p.boosters, &p.factories)),
            Err(resp) => resp,
        },
        "get_body_states" => match parse::<Vec<ObjectId>>(data) {
            Ok(ids) => reply(broker.get_body_states(&ids)),
            Err(resp) => resp,
        },
        "get_aabbs" => match parse::<Vec<ObjectId>>(data) {
            Ok(ids) => reply(broker.get_aabbs(&ids)),
            Err(resp) => resp,
        },
        "get_all_object_ids" => reply(broker.get_all_object_ids()),
        "get_fragments" => match parse::<Vec<ObjectId>>(data) {
            Ok(ids) => reply(broker.get_fragments(&ids)),
            Err(resp) => resp,
        },
        other => Response::error(format!("unknown command `{other}`")),
    }
}
