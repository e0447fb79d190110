//! The action catalog (spec §6 "Action catalog"): a fixed vocabulary of
//! `action` strings, each reached through one MCP tool name. The table is
//! generated by `bridge_action_macros::action_catalog!` so that the
//! tool-name -> action mapping is total and checked at compile time
//! (spec §9 "the helper's name->action translation is a total
//! compile-time table").

bridge_action_macros::action_catalog! {
	Navigate => wire: "navigate", tool: "browser_navigate", description: "Navigate the bound tab to a URL.";
	Click => wire: "click", tool: "browser_click", description: "Click an element in the bound tab.";
	Type => wire: "type", tool: "browser_type", description: "Type text into a focused element.";
	Scroll => wire: "scroll", tool: "browser_scroll", description: "Scroll the page or an element.";
	Screenshot => wire: "screenshot", tool: "browser_screenshot", description: "Capture a screenshot of the bound tab.";
	Evaluate => wire: "evaluate", tool: "browser_evaluate", description: "Evaluate a JavaScript expression in the page.";
	GetPageInfo => wire: "get_page_info", tool: "browser_get_page_info", description: "Get the current URL and title of the bound tab.";
	GetDomTree => wire: "get_dom_tree", tool: "browser_get_dom_tree", description: "Get a structured snapshot of the page DOM.";
	GetTabs => wire: "get_tabs", tool: "browser_get_tabs", description: "List open browser tabs.";
	SwitchTab => wire: "switch_tab", tool: "browser_switch_tab", description: "Switch the session's home tab to an existing tab.";
	PressKey => wire: "press_key", tool: "browser_press_key", description: "Send a keyboard key press.";
	WaitForSelector => wire: "wait_for_selector", tool: "browser_wait_for_selector", description: "Wait until a selector matches an element.";
	WaitForLoadState => wire: "wait_for_load_state", tool: "browser_wait_for_load_state", description: "Wait for a page load-state milestone.";
	WaitForFunction => wire: "wait_for_function", tool: "browser_wait_for_function", description: "Wait until a JavaScript predicate returns true.";
	EnableNetwork => wire: "enable_network", tool: "browser_enable_network", description: "Start capturing network activity for the bound tab.";
	GetNetworkRequests => wire: "get_network_requests", tool: "browser_get_network_requests", description: "Return captured network requests.";
	WaitForResponse => wire: "wait_for_response", tool: "browser_wait_for_response", description: "Wait for a network response matching a pattern.";
	UploadFile => wire: "upload_file", tool: "browser_upload_file", description: "Upload a local file through a file input.";
	GetDialog => wire: "get_dialog", tool: "browser_get_dialog", description: "Inspect the currently open JavaScript dialog, if any.";
	HandleDialog => wire: "handle_dialog", tool: "browser_handle_dialog", description: "Accept or dismiss the currently open JavaScript dialog.";
	Hover => wire: "hover", tool: "browser_hover", description: "Hover the pointer over an element.";
	DoubleClick => wire: "double_click", tool: "browser_double_click", description: "Double-click an element.";
	RightClick => wire: "right_click", tool: "browser_right_click", description: "Right-click an element.";
	Download => wire: "download", tool: "browser_download", description: "Trigger and wait for a file download.";
	Lock => wire: "lock", tool: "browser_lock", description: "Pin the session's home tab so implicit resolution never rebinds it.";
	Unlock => wire: "unlock", tool: "browser_unlock", description: "Release a previous lock on the session's home tab.";
	UpdateStatus => wire: "update_status", tool: "browser_update_status", description: "Report helper-side status text into the side panel's log pane.";
}
