mod composer_over_workspace;
