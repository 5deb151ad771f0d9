//! Types used to assert that a presented token grants the permissions an
//! endpoint requires

/// Constructs an extractor that verifies the bearer token on a request and
/// asserts that it grants the expected permissions.
///
/// For a more concise way to construct several guards, see
/// [`permission_guards!`][crate::permission_guards!].
///
/// In the simplest case, a single permission is required:
///
/// ```
/// use barista_axum::permission_guard;
///
/// permission_guard!(DrinksDetail; "get:drinks-detail");
/// ```
///
/// Permissions that must all be held are separated by spaces:
///
/// ```
/// use barista_axum::permission_guard;
///
/// permission_guard!(Editor; "post:drinks patch:drinks");
/// ```
///
/// Alternative sets of permissions are separated with the logical or
/// operator (`||`). Holding every permission of any one set suffices:
///
/// ```
/// use barista_axum::permission_guard;
///
/// permission_guard!(
///     EditorOrJanitor;
///     ["post:drinks patch:drinks" || "delete:drinks"]
/// );
/// ```
///
/// A guard declared with `*` only verifies the token:
///
/// ```
/// use barista_axum::permission_guard;
///
/// permission_guard!(Authenticated; *);
/// ```
///
/// The guard reads the [`AuthMiddleware`](barista_auth::AuthMiddleware)
/// from the router state, so the state must either be the middleware itself
/// or implement [`FromRef`](axum_core::extract::FromRef) for it. The
/// verified claims are handed to the handler inside the guard.
///
/// ```no_run
/// use axum::{routing::get, Router};
/// use barista_auth::{AuthConfig, AuthMiddleware, HasPermissions};
/// use barista_axum::permission_guard;
///
/// permission_guard!(DrinksDetail; "get:drinks-detail");
///
/// async fn details(DrinksDetail(claims): DrinksDetail) -> String {
///     format!("granted {:?}", claims.permissions())
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = AuthMiddleware::from_config(&AuthConfig::new("barista.eu.auth0.com", "coffee"))?;
///
/// let router: Router = Router::new()
///     .route("/drinks-detail", get(details))
///     .with_state(auth);
/// # let _ = router;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! permission_guard {
    (@impl $vis:vis $i:ident; $policy:expr) => {
        impl $i {
            #[allow(dead_code)]
            $vis fn into_claims(self) -> $crate::__private::Claims {
                self.0
            }

            #[allow(dead_code)]
            $vis fn claims(&self) -> &$crate::__private::Claims {
                &self.0
            }
        }

        impl $crate::EndpointPermissionPolicy for $i {
            fn permission_policy() -> &'static $crate::__private::PermissionPolicy {
                static POLICY: $crate::__private::OnceCell<$crate::__private::PermissionPolicy> =
                    $crate::__private::OnceCell::new();
                POLICY.get_or_init(|| $policy)
            }
        }

        #[$crate::__private::async_trait]
        impl<S> $crate::__private::FromRequestParts<S> for $i
        where
            S: Send + Sync,
            $crate::__private::AuthMiddleware: $crate::__private::FromRef<S>,
        {
            type Rejection = $crate::AuthFailed;

            async fn from_request_parts(
                req: &mut $crate::__private::Parts,
                state: &S,
            ) -> Result<Self, Self::Rejection> {
                $crate::__private::from_request(
                    req,
                    state,
                    <Self as $crate::EndpointPermissionPolicy>::permission_policy(),
                )
                .await
                .map(Self)
            }
        }
    };
    ($vis:vis $i:ident; *) => {
        /// A guard that admits any request bearing a valid token, returning
        /// its claims
        $vis struct $i($vis $crate::__private::Claims);

        $crate::permission_guard!(@impl $vis $i; $crate::__private::PermissionPolicy::allow_any());
    };
    ($vis:vis $i:ident; $permissions:literal) => {
        $crate::permission_guard!($vis $i; [$permissions]);
    };
    ($vis:vis $i:ident; [$($permissions:literal)||* $(,)?]) => {
        /// Ensures that a bearer token grants access to an endpoint,
        /// returning its claims
        ///
        /// The token must hold every permission of one of the following
        /// sets to be authorized:
        $(
            #[doc = concat!("* `", $permissions, "`")]
        )*
        $vis struct $i($vis $crate::__private::Claims);

        $crate::permission_guard!(@impl $vis $i; $crate::__private::PermissionPolicy::deny_all()
            $(
                .or_allow(
                    $permissions.parse().expect(concat!("invalid permissions: ", $permissions))
                )
            )*
        );
    };
}

/// Convenience macro for services that need to define many guards.
///
/// # Example
///
/// ```
/// use barista_axum::permission_guards;
///
/// permission_guards! {
///     permission DrinksDetail = "get:drinks-detail";
///     permission PostDrinks = "post:drinks";
///     permission PatchDrinks = "patch:drinks";
///     permission DeleteDrinks = "delete:drinks";
///     permission Editor = ["post:drinks patch:drinks" || "delete:drinks"];
///     permission Authenticated = *;
///     permission DenyAll = [];
/// }
/// ```
///
/// The above will define a guard type for each entry, similar to the
/// [`permission_guard!`] macro.
#[macro_export]
macro_rules! permission_guards {
    ($($vis:vis permission $i:ident = $permissions:tt);* $(;)?) => {
        $(
            $crate::permission_guard!($vis $i; $permissions);
        )*
    };
}
