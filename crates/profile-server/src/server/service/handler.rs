//! gRPC entry point for the profile service.
//!
//! [`UserHandler`] implements the generated [`UserService`] trait by decoding
//! each request into domain values, calling the shared [`ProfileService`], and
//! encoding the result. Failures leave through `From<Error> for Status`.

use crate::server::{
    service::{mask, resource::ProfileService},
    store::UserStore,
    telemetry::log_call,
};
use core::fmt::Debug;
use profile_core::{
    Error,
    proto::{
        CreateRequest, CreateResponse, DeleteRequest, ListRequest, ListResponse, ReadRequest,
        ReadResponse, ReplaceRequest, UpdateRequest, user_service_server::UserService,
    },
};
use std::time::Instant;
use tonic::{Code, Request, Response, Status};

pub struct UserHandler<S> {
    service: ProfileService<S>,
    log_payload: bool,
}

impl<S> Clone for UserHandler<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            log_payload: self.log_payload,
        }
    }
}

impl<S: UserStore> UserHandler<S> {
    pub const fn new(service: ProfileService<S>, log_payload: bool) -> Self {
        Self {
            service,
            log_payload,
        }
    }

    fn log_request<T: Debug>(&self, method: &'static str, request: &Request<T>) {
        if self.log_payload {
            tracing::debug!(method, payload = ?request.get_ref(), "grpc request");
        }
    }

    fn finish<T: Debug>(
        &self,
        method: &'static str,
        start: Instant,
        result: profile_core::Result<T>,
    ) -> Result<Response<T>, Status> {
        let code = result.as_ref().map_or_else(Error::code, |_| Code::Ok);
        log_call("grpc", method, code, start.elapsed());
        if self.log_payload {
            if let Ok(body) = &result {
                tracing::debug!(method, payload = ?body, "grpc response");
            }
        }
        result.map(Response::new).map_err(Status::from)
    }
}

#[tonic::async_trait]
impl<S: UserStore> UserService for UserHandler<S> {
    async fn create(
        &self,
        req: Request<CreateRequest>,
    ) -> Result<Response<CreateResponse>, Status> {
        let start = Instant::now();
        self.log_request("Create", &req);

        let result = match req.into_inner().user {
            Some(user) => self
                .service
                .create(user.into())
                .await
                .map(|id| CreateResponse { id }),
            None => Err(Error::invalid_argument("user is required")),
        };
        self.finish("Create", start, result)
    }

    async fn read(&self, req: Request<ReadRequest>) -> Result<Response<ReadResponse>, Status> {
        let start = Instant::now();
        self.log_request("Read", &req);

        let ReadRequest { id, fields } = req.into_inner();
        let result = self
            .service
            .read(id, mask::projection(fields.map(Into::into)))
            .await
            .map(|user| ReadResponse {
                user: Some(user.into()),
            });
        self.finish("Read", start, result)
    }

    async fn list(&self, req: Request<ListRequest>) -> Result<Response<ListResponse>, Status> {
        let start = Instant::now();
        self.log_request("List", &req);

        let ListRequest {
            limit,
            offset,
            fields,
        } = req.into_inner();
        let result = self
            .service
            .list(limit, offset, mask::projection(fields.map(Into::into)))
            .await
            .map(|page| ListResponse {
                users: page.users.into_iter().map(Into::into).collect(),
                limit: page.window.limit,
                offset: page.window.offset,
                total: page.total,
            });
        self.finish("List", start, result)
    }

    async fn update(&self, req: Request<UpdateRequest>) -> Result<Response<()>, Status> {
        let start = Instant::now();
        self.log_request("Update", &req);

        let UpdateRequest { id, user, fields } = req.into_inner();
        let result = match mask::update_whitelist(fields.map(Into::into)) {
            Ok(whitelist) => {
                self.service
                    .update(id, user.unwrap_or_default().into(), whitelist)
                    .await
            }
            Err(err) => Err(err),
        };
        self.finish("Update", start, result)
    }

    async fn replace(&self, req: Request<ReplaceRequest>) -> Result<Response<()>, Status> {
        let start = Instant::now();
        self.log_request("Replace", &req);

        let ReplaceRequest { id, user } = req.into_inner();
        let result = self
            .service
            .replace(id, user.unwrap_or_default().into())
            .await;
        self.finish("Replace", start, result)
    }

    async fn delete(&self, req: Request<DeleteRequest>) -> Result<Response<()>, Status> {
        let start = Instant::now();
        self.log_request("Delete", &req);

        let result = self.service.delete(req.into_inner().id).await;
        self.finish("Delete", start, result)
    }
}
