// GET /status handler

use std::convert::Infallible;

use crate::models::StatusResponse;

pub async fn status_handler() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&StatusResponse::default()))
}
