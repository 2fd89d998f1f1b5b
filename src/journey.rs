//! Workflow definitions built from the site configuration

use tracing::{info, warn};

use crate::config::AuditConfig;
use crate::workflow::{Action, Step};

pub const COOKIE_ACCEPT: &str = "cookie_accept_button";
pub const SEARCH_RESULT_ITEM: &str = "search_result_item";
pub const SIZE_OPTION: &str = "size_option";
pub const COLOR_OPTION: &str = "color_option";
pub const ADD_TO_CART: &str = "add_to_cart_button";
pub const DIALOG_TO_CART: &str = "dialog_to_cart_button";

/// Search → product page → cart, one audit per page.
///
/// A step whose key selector is not configured is left out together with
/// every step after it; the run then simply reports fewer pages.
pub fn shopping_journey(config: &AuditConfig) -> Vec<Step> {
    let timeouts = &config.timeouts;
    let mut steps = Vec::new();

    let mut search = Step::new("Search results page")
        .required(Action::Goto {
            url: config.site.search_url(),
            timeout: timeouts.navigation(),
        })
        .required(Action::WaitForLoad {
            timeout: timeouts.navigation(),
        });
    if let Some(cookie) = config.selector(COOKIE_ACCEPT) {
        let budget = timeouts.optional_element() + timeouts.settle() + timeouts.ui_pause();
        search = search.best_effort(
            "cookie consent banner",
            budget,
            vec![
                Action::WaitVisible {
                    selector: cookie.to_string(),
                    timeout: timeouts.optional_element(),
                },
                Action::Click {
                    selector: cookie.to_string(),
                },
                Action::WaitForLoad {
                    timeout: timeouts.settle(),
                },
                Action::Pause(timeouts.ui_pause()),
            ],
        );
    }
    steps.push(search);

    let Some(item) = config.selector(SEARCH_RESULT_ITEM) else {
        warn!("No selector for '{}', skipping product and cart pages", SEARCH_RESULT_ITEM);
        return steps;
    };
    steps.push(
        Step::new("Product detail page")
            .required(Action::WaitVisible {
                selector: item.to_string(),
                timeout: timeouts.element(),
            })
            .required(Action::Click {
                selector: item.to_string(),
            })
            .required(Action::WaitForLoad {
                timeout: timeouts.navigation(),
            }),
    );

    let Some(add_to_cart) = config.selector(ADD_TO_CART) else {
        warn!("No selector for '{}', skipping cart page", ADD_TO_CART);
        return steps;
    };
    let Some(to_cart) = config.selector(DIALOG_TO_CART) else {
        warn!("No selector for '{}', cannot navigate to cart", DIALOG_TO_CART);
        return steps;
    };

    let mut cart = Step::new("Cart page");
    for name in [SIZE_OPTION, COLOR_OPTION] {
        match config.selector(name) {
            Some(selector) => {
                cart = cart
                    .required(Action::WaitVisible {
                        selector: selector.to_string(),
                        timeout: timeouts.element(),
                    })
                    .required(Action::Click {
                        selector: selector.to_string(),
                    })
                    .required(Action::Pause(timeouts.ui_pause()));
            }
            None => info!("No selector for '{}', leaving the default", name),
        }
    }
    cart = cart
        .required(Action::WaitVisible {
            selector: add_to_cart.to_string(),
            timeout: timeouts.element(),
        })
        .required(Action::Click {
            selector: add_to_cart.to_string(),
        })
        .required(Action::WaitVisible {
            selector: to_cart.to_string(),
            timeout: timeouts.dialog(),
        })
        .required(Action::WaitForLoad {
            timeout: timeouts.navigation(),
        })
        .required(Action::Click {
            selector: to_cart.to_string(),
        })
        .required(Action::WaitForLoad {
            timeout: timeouts.navigation(),
        })
        .best_effort(
            "cart page URL",
            timeouts.element(),
            vec![Action::WaitForUrl {
                fragment: config.site.cart_url_fragment.clone(),
                timeout: timeouts.element(),
            }],
        );
    steps.push(cart);

    steps
}

/// Audit a single URL without any interaction.
pub fn single_page(config: &AuditConfig, url: &str) -> Vec<Step> {
    vec![
        Step::new(format!("Page {url}"))
            .required(Action::Goto {
                url: url.to_string(),
                timeout: config.timeouts.navigation(),
            })
            .required(Action::WaitForLoad {
                timeout: config.timeouts.navigation(),
            }),
    ]
}

/// The journey selected by the configuration.
pub fn for_config(config: &AuditConfig) -> Vec<Step> {
    match &config.audit_url {
        Some(url) => single_page(config, url),
        None => shopping_journey(config),
    }
}
